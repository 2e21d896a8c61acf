use crate::error::PowerFlowError;
use crate::network::Network;
use crate::newton::{LogProgress, ProgressMonitor};
use crate::pfopt::PFOpt;
use crate::runpf::{runpf, InitialGuess, PowerFlowSolution};

/// A power flow solver as seen by the dataset generator: a network and
/// a starting point in, a converged solution (with the solver's
/// admittance matrix, injections and iteration count) or a failure out.
pub trait PowerFlowSolver {
    fn solve(
        &self,
        net: &Network,
        init: &InitialGuess,
        opt: &PFOpt,
    ) -> Result<PowerFlowSolution, PowerFlowError>;
}

/// AC power flow using the algorithm selected in the options.
#[derive(Default)]
pub struct AcPowerFlow {
    /// Log the per-iteration mismatch table.
    pub verbose: bool,
}

impl PowerFlowSolver for AcPowerFlow {
    fn solve(
        &self,
        net: &Network,
        init: &InitialGuess,
        opt: &PFOpt,
    ) -> Result<PowerFlowSolution, PowerFlowError> {
        let progress = LogProgress {};
        let monitor: Option<&dyn ProgressMonitor> = if self.verbose {
            Some(&progress)
        } else {
            None
        };

        let result = runpf(net, opt, init, monitor)?;
        if !result.success {
            return Err(PowerFlowError::NotConverged {
                iterations: result.solution.iterations,
                mismatch: result.solution.mismatch,
            });
        }
        Ok(result.solution)
    }
}
