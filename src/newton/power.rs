use crate::debug::{format_f64_vec, format_polar_vec, format_rect_vec};
use crate::error::PowerFlowError;
use crate::newton::ProgressMonitor;
use crate::pfopt::PFOpt;
use crate::residual::{bus_current, norm_inf, power_mismatch};
use crate::sbus::SBus;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use std::iter::zip;

/// Computes partial derivatives of power injection w.r.t. voltage
/// angle and magnitude (polar coordinates).
pub fn d_sbus_d_v(
    y_bus: &DMatrix<Complex64>,
    v: &[Complex64],
) -> (DMatrix<Complex64>, DMatrix<Complex64>) {
    let nb = v.len();
    let i_bus = bus_current(y_bus, v);
    let v_norm: Vec<Complex64> = v.iter().map(|v| *v / v.norm()).collect();
    let j = Complex64::i();

    // dSbus/dVa = 1j * diagV * conj(diagIbus - Ybus * diagV)
    // dSbus/dVm = diagV * conj(Ybus * diagVnorm) + conj(diagIbus) * diagVnorm
    let mut d_sbus_d_va = DMatrix::<Complex64>::zeros(nb, nb);
    let mut d_sbus_d_vm = DMatrix::<Complex64>::zeros(nb, nb);
    for r in 0..nb {
        for c in 0..nb {
            let y = y_bus[(r, c)];
            d_sbus_d_va[(r, c)] = j * v[r] * (-(y * v[c])).conj();
            d_sbus_d_vm[(r, c)] = v[r] * (y * v_norm[c]).conj();
        }
        d_sbus_d_va[(r, r)] += j * v[r] * i_bus[r].conj();
        d_sbus_d_vm[(r, r)] += i_bus[r].conj() * v_norm[r];
    }

    (d_sbus_d_va, d_sbus_d_vm)
}

fn mismatch_vector(mis: &[Complex64], pv_pq: &[usize], pq: &[usize]) -> Vec<f64> {
    [
        pv_pq.iter().map(|&i| mis[i].re).collect::<Vec<_>>(),
        pq.iter().map(|&i| mis[i].im).collect::<Vec<_>>(),
    ]
    .concat()
}

/// Solves power flow using full Newton's method (power/polar).
///
/// Solves for bus voltages using a full Newton-Raphson method, using nodal
/// power balance equations and polar coordinate representation of
/// voltages.
///
/// The bus voltage vector contains the set point for the reference
/// buses as well as an initial guess for remaining magnitudes and
/// angles. The tolerance of `mpopt` is in per unit.
///
/// Returns the final complex voltages, a flag which indicates whether it
/// converged or not, and the number of iterations performed.
#[allow(clippy::too_many_arguments)]
pub(crate) fn newtonpf_s_polar(
    y_bus: &DMatrix<Complex64>,
    s_bus_fn: &dyn SBus,
    v0: &[Complex64],
    _ref: &[usize],
    pv: &[usize],
    pq: &[usize],
    mpopt: &PFOpt,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<(Vec<Complex64>, bool, usize), PowerFlowError> {
    let pv_pq = [pv, pq].concat();

    let tol = mpopt.tolerance;
    let max_it = mpopt.max_it_nr;

    let mut converged = false;
    let mut i = 0;
    let mut v: Vec<Complex64> = v0.to_vec();
    let mut va: Vec<f64> = v.iter().map(|v| v.arg()).collect();
    let mut vm: Vec<f64> = v.iter().map(|v| v.norm()).collect();

    // set up indexing for updating V
    let npv = pv.len();
    let npq = pq.len();
    let (j1, j2) = (0, npv); // j1:j2 - V angle of pv buses
    let (j3, j4) = (j2, j2 + npq); // j3:j4 - V angle of pq buses
    let (j5, j6) = (j4, j4 + npq); // j5:j6 - V mag of pq buses

    // evaluate F(x0)
    let s_bus = s_bus_fn.s_bus(&vm);
    let mis = power_mismatch(y_bus, &v, &s_bus);
    let mut f = mismatch_vector(&mis, &pv_pq, pq);
    log::trace!("Sbus0: {}", format_rect_vec(&s_bus));

    // check tolerance
    let norm_f = norm_inf(&f);
    if let Some(pm) = progress {
        pm.update(i, norm_f);
    }
    if norm_f < tol {
        converged = true;
        log::debug!("Converged!");
    }
    log::trace!("norm_f0: {}", norm_f);

    // do Newton iterations
    while !converged && i < max_it {
        // update iteration counter
        i += 1;

        // evaluate Jacobian
        let (d_sbus_d_va, mut d_sbus_d_vm) = d_sbus_d_v(y_bus, &v);
        let neg_d_sd_d_vm = s_bus_fn.d_sbus_d_vm(&vm);
        for (k, d) in neg_d_sd_d_vm.iter().enumerate() {
            d_sbus_d_vm[(k, k)] -= *d;
        }

        let n = j6;
        let mut jac = DMatrix::<f64>::zeros(n, n);
        for (r, &br) in pv_pq.iter().enumerate() {
            for (c, &bc) in pv_pq.iter().enumerate() {
                jac[(r, c)] = d_sbus_d_va[(br, bc)].re; // J11
            }
            for (c, &bc) in pq.iter().enumerate() {
                jac[(r, j4 + c)] = d_sbus_d_vm[(br, bc)].re; // J12
            }
        }
        for (r, &br) in pq.iter().enumerate() {
            for (c, &bc) in pv_pq.iter().enumerate() {
                jac[(j4 + r, c)] = d_sbus_d_va[(br, bc)].im; // J21
            }
            for (c, &bc) in pq.iter().enumerate() {
                jac[(j4 + r, j4 + c)] = d_sbus_d_vm[(br, bc)].im; // J22
            }
        }
        log::trace!("J_{}:\n{}", i, jac);

        // compute update step
        let dx = {
            let neg_f = DVector::from_iterator(n, f.iter().map(|f| -f));
            log::trace!("-F: {}", format_f64_vec(neg_f.as_slice()));
            jac.lu().solve(&neg_f).ok_or(PowerFlowError::Singular(i))?
        };
        log::trace!("dx: {}", format_f64_vec(dx.as_slice()));

        // update voltage
        for (k, j) in (j1..j2).enumerate() {
            va[pv[k]] += dx[j];
        }
        for (k, j) in (j3..j4).enumerate() {
            va[pq[k]] += dx[j];
        }
        for (k, j) in (j5..j6).enumerate() {
            vm[pq[k]] += dx[j];
        }

        // update Vm and Va again in case we wrapped around with a negative Vm
        v = zip(&vm, &va)
            .map(|(&vm, &va)| Complex64::from_polar(vm, va))
            .collect();
        va = v.iter().map(|v| v.arg()).collect();
        vm = v.iter().map(|v| v.norm()).collect();
        log::trace!("V_{}: {}", i, format_polar_vec(&v));

        // evalute F(x)
        let s_bus = s_bus_fn.s_bus(&vm);
        let mis = power_mismatch(y_bus, &v, &s_bus);
        f = mismatch_vector(&mis, &pv_pq, pq);

        // check for convergence
        let norm_f = norm_inf(&f);
        if let Some(pm) = progress {
            pm.update(i, norm_f);
        }
        if norm_f < tol {
            converged = true;
            log::debug!(
                "Newton's method power flow (power balance, polar) converged in {} iterations.",
                i
            );
        }
        log::trace!("norm_f{}: {}", i, norm_f);
    }

    if !converged {
        log::debug!(
            "Newton's method power flow (power balance, polar) did not converge in {} iterations.",
            i
        );
    }

    Ok((v, converged, i))
}
