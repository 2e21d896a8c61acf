use itertools::izip;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use std::iter::zip;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResidualError {
    #[error("dimension mismatch: {0}")]
    Dimension(String),
}

/// Injected bus currents `Ybus * V`.
pub fn bus_current(y_bus: &DMatrix<Complex64>, v: &[Complex64]) -> Vec<Complex64> {
    let i_bus = y_bus * DVector::from_column_slice(v);
    i_bus.iter().copied().collect()
}

/// Complex power mismatch `V .* conj(Ybus * V) - Sbus` at every bus.
pub fn power_mismatch(
    y_bus: &DMatrix<Complex64>,
    v: &[Complex64],
    s_bus: &[Complex64],
) -> Vec<Complex64> {
    let i_bus = bus_current(y_bus, v);
    izip!(v, &i_bus, s_bus)
        .map(|(v, i_bus, s_bus)| v * i_bus.conj() - s_bus)
        .collect()
}

/// Computes the infinity norm: `max(abs(a))`. Any non-finite entry
/// makes the norm infinite.
pub fn norm_inf(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |max, x| {
        if !x.is_finite() {
            f64::INFINITY
        } else {
            max.max(x.abs())
        }
    })
}

/// Complex bus voltages from magnitudes (p.u.) and angles (degrees).
pub fn polar_to_complex(vm: &[f64], va_degree: &[f64]) -> Vec<Complex64> {
    zip(vm, va_degree)
        .map(|(&vm, &va)| Complex64::from_polar(vm, va.to_radians()))
        .collect()
}

/// Computes the AC power flow residual at a voltage solution.
///
/// Forms the complex voltage from `vm` and `va_degree`, evaluates the
/// bus power `V .* conj(Ybus * V)` and subtracts the specified
/// injection `s`. Entries of the reference buses, whose injection is
/// free, are dropped.
pub fn compute_residual(
    vm: &[f64],
    va_degree: &[f64],
    y_bus: &DMatrix<Complex64>,
    s: &[Complex64],
    ref_buses: &[usize],
) -> Result<Vec<Complex64>, ResidualError> {
    let nb = vm.len();
    if va_degree.len() != nb || s.len() != nb {
        return Err(ResidualError::Dimension(format!(
            "{} magnitudes, {} angles, {} injections",
            nb,
            va_degree.len(),
            s.len()
        )));
    }
    if y_bus.nrows() != nb || y_bus.ncols() != nb {
        return Err(ResidualError::Dimension(format!(
            "Ybus is {}x{}, expected {}x{}",
            y_bus.nrows(),
            y_bus.ncols(),
            nb,
            nb
        )));
    }
    if let Some(&r) = ref_buses.iter().find(|&&r| r >= nb) {
        return Err(ResidualError::Dimension(format!(
            "reference bus {} out of range for {} buses",
            r, nb
        )));
    }

    let v = polar_to_complex(vm, va_degree);
    let mis = power_mismatch(y_bus, &v, s);

    Ok(mis
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !ref_buses.contains(i))
        .map(|(_, m)| m)
        .collect())
}
