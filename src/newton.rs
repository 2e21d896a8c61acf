mod power;

pub(crate) use power::*;

/// Receives the mismatch norm after every iteration of an iterative
/// power flow method.
pub trait ProgressMonitor {
    fn update(&self, i: usize, norm_f: f64);
}

/// Logs the iteration table at debug level.
pub struct LogProgress {}

impl ProgressMonitor for LogProgress {
    fn update(&self, i: usize, norm_f: f64) {
        if i == 0 {
            log::debug!(" it    max P & Q mismatch (p.u.)");
            log::debug!("----  ---------------------------");
        }
        log::debug!("{:3}        {:10.3e}", i, norm_f);
    }
}
