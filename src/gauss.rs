use crate::debug::format_rect_vec;
use crate::error::PowerFlowError;
use crate::newton::ProgressMonitor;
use crate::pfopt::PFOpt;
use crate::residual::{norm_inf, power_mismatch};
use crate::sbus::SBus;

use nalgebra::DMatrix;
use num_complex::Complex64;

fn mismatch_norm(
    y_bus: &DMatrix<Complex64>,
    v: &[Complex64],
    s_bus: &[Complex64],
    pv_pq: &[usize],
    pq: &[usize],
) -> f64 {
    let mis = power_mismatch(y_bus, v, s_bus);
    let f: Vec<f64> = [
        pv_pq.iter().map(|&i| mis[i].re).collect::<Vec<_>>(),
        pq.iter().map(|&i| mis[i].im).collect::<Vec<_>>(),
    ]
    .concat();
    norm_inf(&f)
}

// Solves the power flow using a Gauss-Seidel method.
//
// Solves for bus voltages given the full system admittance matrix (for
// all buses), the complex bus power injection function, the initial
// vector of complex bus voltages, and the lists of bus indices for the
// swing bus, PV buses, and PQ buses, respectively. The bus voltage vector
// contains the set point for the reference buses as well as an initial
// guess for remaining magnitudes and angles. Returns the final complex
// voltages, a flag which indicates whether it converged or not, and the
// number of iterations performed.
#[allow(non_snake_case, clippy::too_many_arguments)]
pub(crate) fn gausspf(
    Ybus: &DMatrix<Complex64>,
    SbusFn: &dyn SBus,
    V0: &[Complex64],
    _ref: &[usize],
    pv: &[usize],
    pq: &[usize],
    mpopt: &PFOpt,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<(Vec<Complex64>, bool, usize), PowerFlowError> {
    let pv_pq = [pv, pq].concat();

    // options
    let tol = mpopt.tolerance;
    let max_it = mpopt.max_it_gs;

    // initialize
    let mut converged = false;
    let mut i = 0;
    let mut V = V0.to_vec();
    let Vm: Vec<f64> = V.iter().map(|v| v.norm()).collect();

    // evaluate F(x0)
    let mut Sbus = SbusFn.s_bus(&Vm);
    log::trace!("Sbus0: {}", format_rect_vec(&Sbus));

    // check tolerance
    let normF = mismatch_norm(Ybus, &V, &Sbus, &pv_pq, pq);
    if let Some(pm) = progress {
        pm.update(i, normF);
    }
    if normF < tol {
        converged = true;
        log::debug!("Converged!");
    }
    log::trace!("normF0: {}", normF);

    let diagYbus: Vec<Complex64> = Ybus.diagonal().iter().copied().collect();
    if pq.iter().chain(pv).any(|&k| diagYbus[k].norm() == 0.0) {
        return Err(PowerFlowError::Singular(i));
    }

    // do Gauss-Seidel iterations
    while !converged && i < max_it {
        // update iteration counter
        i += 1;

        // update voltage
        // at PQ buses
        for &k in pq {
            let Ik: Complex64 = Ybus.row(k).iter().zip(&V).map(|(y, v)| y * v).sum();
            V[k] = V[k] + ((Sbus[k] / V[k]).conj() - Ik) / diagYbus[k];
        }

        // at PV buses
        if !pv.is_empty() {
            for &k in pv {
                let Ik: Complex64 = Ybus.row(k).iter().zip(&V).map(|(y, v)| y * v).sum();
                Sbus[k] = Complex64::new(Sbus[k].re, (V[k] * Ik.conj()).im);
                V[k] = V[k] + ((Sbus[k] / V[k]).conj() - Ik) / diagYbus[k];
            }
            for &k in pv {
                V[k] = V[k] * (Vm[k] / V[k].norm());
            }
        }

        // evalute F(x)
        let Vm_i: Vec<f64> = V.iter().map(|v| v.norm()).collect();
        Sbus = SbusFn.s_bus(&Vm_i);
        log::trace!("Sbus_{}: {}", i, format_rect_vec(&Sbus));

        // check for convergence
        let norm_f = mismatch_norm(Ybus, &V, &Sbus, &pv_pq, pq);
        if let Some(pm) = progress {
            pm.update(i, norm_f);
        }
        if norm_f < tol {
            converged = true;
            log::debug!("Gauss-Seidel power flow converged in {} iterations.", i);
        }
        log::trace!("norm_f{}: {}", i, norm_f);
    }

    if !converged {
        log::debug!(
            "Gauss-Seidel power flow did not converge in {} iterations.",
            i
        );
    }

    Ok((V, converged, i))
}
