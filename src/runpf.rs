use crate::bus_types::bus_types;
use crate::debug::{format_polar_vec, format_rect_mat};
use crate::error::PowerFlowError;
use crate::gauss;
use crate::network::Network;
use crate::newton::*;
use crate::order::BusOrder;
use crate::pfopt::{Alg, PFOpt};
use crate::residual::{norm_inf, power_mismatch};
use crate::sbus::{MakeSBus, SBus};
use crate::ybus::make_ybus;

use nalgebra::DMatrix;
use num_complex::Complex64;
use std::time::{Duration, Instant};

/// Starting point of an iterative solve.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InitialGuess {
    /// 1.0 p.u. and 0 degrees at every bus.
    #[default]
    Flat,
    /// Values stored on the buses, flat where none is stored.
    Bus,
    /// One magnitude (p.u.) and angle (degrees) per bus, in bus order.
    Custom {
        vm_pu: Vec<f64>,
        va_degree: Vec<f64>,
    },
}

/// Voltage solution together with the solver internals it was
/// computed from. Vectors follow the internal bus order.
#[derive(Debug, Clone)]
pub struct PowerFlowSolution {
    pub vm_pu: Vec<f64>,
    pub va_degree: Vec<f64>,
    pub v: Vec<Complex64>,

    /// Bus admittance matrix (p.u.).
    pub y_bus: DMatrix<Complex64>,
    /// Specified complex bus injections at the solved voltage (p.u.).
    pub s_bus: Vec<Complex64>,

    pub ref_buses: Vec<usize>,
    /// External index of each internal bus.
    pub bus_index: Vec<usize>,

    pub iterations: usize,
    /// Largest P or Q mismatch at the returned voltage (MVA).
    pub mismatch: f64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct PowerFlowResult {
    pub solution: PowerFlowSolution,
    pub success: bool,
}

/// Builds the initial complex voltage vector. Reference buses always
/// start at their external grid set point.
pub fn initial_voltage(
    net: &Network,
    order: &BusOrder,
    init: &InitialGuess,
) -> Result<Vec<Complex64>, PowerFlowError> {
    let nb = order.len();

    let (vm, va): (Vec<f64>, Vec<f64>) = match init {
        InitialGuess::Flat => (vec![1.0; nb], vec![0.0; nb]),
        InitialGuess::Bus => net
            .bus
            .iter()
            .map(|b| (b.vm_pu.unwrap_or(1.0), b.va_degree.unwrap_or(0.0)))
            .unzip(),
        InitialGuess::Custom { vm_pu, va_degree } => {
            for got in [vm_pu.len(), va_degree.len()] {
                if got != nb {
                    return Err(PowerFlowError::InitLength { expected: nb, got });
                }
            }
            (vm_pu.clone(), va_degree.clone())
        }
    };

    let mut v0: Vec<Complex64> = vm
        .iter()
        .zip(&va)
        .map(|(&vm, &va)| Complex64::from_polar(vm, va.to_radians()))
        .collect();

    // the first in-service external grid of a bus sets its voltage
    for eg in net.ext_grid.iter().filter(|eg| eg.in_service).rev() {
        let i = order.int("ext_grid", eg.bus)?;
        v0[i] = Complex64::from_polar(eg.vm_pu, eg.va_degree.to_radians());
    }

    Ok(v0)
}

/// Runs an AC power flow on `net` starting from `init`.
///
/// Returns the voltage solution and whether the solver converged. A
/// non-converged result carries the last iterate.
pub fn runpf(
    net: &Network,
    mpopt: &PFOpt,
    init: &InitialGuess,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<PowerFlowResult, PowerFlowError> {
    let order = BusOrder::new(net)?;
    if order.is_empty() {
        log::error!("Power flow not valid: network contains no buses");
        return Err(PowerFlowError::EmptyNetwork);
    }

    // get bus index lists of each type of bus
    let (ref_, pv, pq) = bus_types(net, &order)?;
    if ref_.is_empty() {
        return Err(PowerFlowError::NoReferenceBus);
    }

    // build admittance matrix and injections
    let y_bus = make_ybus(net, &order)?;
    log::trace!("Ybus:\n{}", format_rect_mat(&y_bus));
    let s_bus_fn = MakeSBus::new(net, &order)?;

    // initial state
    let v0 = initial_voltage(net, &order, init)?;
    log::debug!("V0: {}", format_polar_vec(&v0));

    // mismatch tolerance in per unit
    let opt = mpopt.with_tolerance(mpopt.tolerance / net.sn_mva);

    //-----  run the power flow  -----
    let t0 = Instant::now();
    let (v, success, iterations) = match mpopt.algorithm {
        Alg::NR => newtonpf_s_polar(&y_bus, &s_bus_fn, &v0, &ref_, &pv, &pq, &opt, progress)?,
        Alg::GS => gauss::gausspf(&y_bus, &s_bus_fn, &v0, &ref_, &pv, &pq, &opt, progress)?,
    };
    let elapsed = t0.elapsed();

    let vm_pu: Vec<f64> = v.iter().map(|v| v.norm()).collect();
    let va_degree: Vec<f64> = v.iter().map(|v| v.arg().to_degrees()).collect();
    let s_bus = s_bus_fn.s_bus(&vm_pu);

    let mis = power_mismatch(&y_bus, &v, &s_bus);
    let f: Vec<f64> = pq
        .iter()
        .chain(&pv)
        .flat_map(|&i| [mis[i].re, mis[i].im])
        .collect();
    let mismatch = norm_inf(&f) * net.sn_mva;

    if success {
        log::debug!(
            "{} power flow converged in {} iterations ({:?}).",
            net.name,
            iterations,
            elapsed
        );
    }

    Ok(PowerFlowResult {
        solution: PowerFlowSolution {
            vm_pu,
            va_degree,
            v,
            y_bus,
            s_bus,
            ref_buses: ref_,
            bus_index: order.i2e,
            iterations,
            mismatch,
            elapsed,
        },
        success,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feeder() -> Network {
        let mut net = Network::new("feeder");
        net.create_buses(&[3, 4, 5], 0.4);
        net.create_ext_grid(3, 1.02, 0.0, None);
        net.create_line_from_parameters(3, 4, 0.5, 0.208, 0.08, 261.0, 0.0, 0.27);
        net.create_line_from_parameters(4, 5, 0.5, 0.208, 0.08, 261.0, 0.0, 0.27);
        net.create_load(4, 0.02, 0.01, None);
        net.create_load(5, 0.03, 0.01, None);
        net
    }

    #[test]
    fn newton_and_gauss_agree() {
        let net = feeder();
        let nr = runpf(&net, &PFOpt::default(), &InitialGuess::Flat, None).unwrap();
        let gs_opt = PFOpt {
            algorithm: Alg::GS,
            ..Default::default()
        };
        let gs = runpf(&net, &gs_opt, &InitialGuess::Flat, None).unwrap();
        assert!(nr.success && gs.success);
        let (a, b) = (&nr.solution, &gs.solution);
        for i in 0..3 {
            assert!((a.vm_pu[i] - b.vm_pu[i]).abs() < 1e-6);
            assert!((a.va_degree[i] - b.va_degree[i]).abs() < 1e-4);
        }
        assert_eq!(nr.solution.vm_pu[0], 1.02);
        assert!(nr.solution.vm_pu[2] < nr.solution.vm_pu[1]);
        assert!(nr.solution.mismatch < 1e-8);
        assert_eq!(nr.solution.bus_index, vec![3, 4, 5]);
    }

    #[test]
    fn reference_bus_keeps_set_point() {
        let net = feeder();
        let init = InitialGuess::Custom {
            vm_pu: vec![0.9, 1.05, 0.95],
            va_degree: vec![12.0, -3.0, 4.0],
        };
        let v0 = initial_voltage(&net, &BusOrder::new(&net).unwrap(), &init).unwrap();
        assert!((v0[0] - Complex64::new(1.02, 0.0)).norm() < 1e-15);
        assert!((v0[1].norm() - 1.05).abs() < 1e-12);
    }

    #[test]
    fn bus_stored_start() {
        let mut net = feeder();
        assert!(net.set_bus_init(4, 0.97, -2.0));
        let order = BusOrder::new(&net).unwrap();
        let v0 = initial_voltage(&net, &order, &InitialGuess::Bus).unwrap();

        assert!((v0[0] - Complex64::new(1.02, 0.0)).norm() < 1e-15);
        let stored = Complex64::from_polar(0.97, (-2.0f64).to_radians());
        assert!((v0[1] - stored).norm() < 1e-15);
        // nothing stored on bus 5
        assert_eq!(v0[2], Complex64::new(1.0, 0.0));

        let opt = PFOpt::default();
        let bus = runpf(&net, &opt, &InitialGuess::Bus, None).unwrap();
        let flat = runpf(&net, &opt, &InitialGuess::Flat, None).unwrap();
        assert!(bus.success);
        for (a, b) in bus.solution.v.iter().zip(&flat.solution.v) {
            assert!((a - b).norm() < 1e-6);
        }
    }

    #[test]
    fn custom_guess_length_is_checked() {
        let net = feeder();
        let init = InitialGuess::Custom {
            vm_pu: vec![1.0; 2],
            va_degree: vec![0.0; 3],
        };
        assert_eq!(
            runpf(&net, &PFOpt::default(), &init, None).err(),
            Some(PowerFlowError::InitLength {
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn requires_an_external_grid() {
        let mut net = feeder();
        net.ext_grid.clear();
        assert_eq!(
            runpf(&net, &PFOpt::default(), &InitialGuess::Flat, None).err(),
            Some(PowerFlowError::NoReferenceBus)
        );
        let empty = Network::new("empty");
        assert_eq!(
            runpf(&empty, &PFOpt::default(), &InitialGuess::Flat, None).err(),
            Some(PowerFlowError::EmptyNetwork)
        );
    }

    #[test]
    fn iteration_cap_is_respected() {
        let net = feeder();
        let opt = PFOpt::default().with_max_it(1).with_tolerance(1e-14);
        let res = runpf(&net, &opt, &InitialGuess::Flat, None).unwrap();
        assert!(!res.success);
        assert_eq!(res.solution.iterations, 1);
    }
}
