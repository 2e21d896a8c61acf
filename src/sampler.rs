use crate::error::PowerFlowError;
use crate::network::Network;
use crate::pfopt::{Alg, PFOpt};
use crate::residual::{compute_residual, ResidualError};
use crate::runpf::{InitialGuess, PowerFlowSolution};
use crate::solver::PowerFlowSolver;

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("base case did not solve: {0}")]
    BaseCase(#[source] PowerFlowError),

    #[error("sample {index}: {source}")]
    Solver {
        index: usize,
        #[source]
        source: PowerFlowError,
    },

    #[error(transparent)]
    Residual(#[from] ResidualError),

    #[error("{name} must be finite, got {value}")]
    InvalidRadius { name: &'static str, value: f64 },
}

/// Which solve provides the iteration count label of a sample.
#[derive(Debug, PartialEq, Copy, Clone, Default, Serialize, Deserialize)]
pub enum IterationSource {
    /// The unperturbed base case.
    #[default]
    Base,
    /// The perturbed restart the sample was taken from.
    Perturbed,
}

#[derive(Debug, Clone)]
pub struct PerturbationConfig {
    pub num_samples: usize,

    /// Iteration cap of the perturbed restarts.
    pub max_iteration: usize,
    /// Mismatch tolerance of the perturbed restarts (MVA).
    pub tolerance_mva: f64,

    /// Voltage magnitude perturbation radius (p.u.).
    pub v_perturb: f64,
    /// Voltage angle perturbation radius (degrees).
    pub theta_perturb: f64,

    /// Iteration cap of the base case.
    pub base_max_iteration: usize,
    /// Mismatch tolerance of the base case (MVA).
    pub base_tolerance_mva: f64,

    pub algorithm: Alg,
    pub iteration_source: IterationSource,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            max_iteration: 50,
            tolerance_mva: 1e-8,
            v_perturb: 0.15,
            theta_perturb: 30.0,
            base_max_iteration: 100,
            base_tolerance_mva: 1e-8,
            algorithm: Alg::NR,
            iteration_source: IterationSource::Base,
        }
    }
}

impl PerturbationConfig {
    /// Rejects perturbation radii that cannot be sampled.
    pub fn validate(&self) -> Result<(), SamplerError> {
        let radii = [
            ("v_perturb", self.v_perturb),
            ("theta_perturb", self.theta_perturb),
        ];
        for (name, value) in radii {
            // the sampled interval is twice the radius wide
            if !(2.0 * value).is_finite() {
                return Err(SamplerError::InvalidRadius { name, value });
            }
        }
        Ok(())
    }

    fn base_opt(&self) -> PFOpt {
        PFOpt {
            algorithm: self.algorithm,
            tolerance: self.base_tolerance_mva,
            ..Default::default()
        }
        .with_max_it(self.base_max_iteration)
    }

    fn sample_opt(&self) -> PFOpt {
        PFOpt {
            algorithm: self.algorithm,
            tolerance: self.tolerance_mva,
            ..Default::default()
        }
        .with_max_it(self.max_iteration)
    }
}

/// One perturbed restart and its converged solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Active power injections (p.u.).
    pub p: Vec<f64>,
    /// Reactive power injections (p.u.).
    pub q: Vec<f64>,
    /// Ybus conductances, row-major.
    pub g: Vec<f64>,
    /// Ybus susceptances, row-major.
    pub b: Vec<f64>,
    pub v_init: Vec<f64>,
    pub theta_init: Vec<f64>,
    pub iterations: usize,
    pub v_pred: Vec<f64>,
    pub phi_pred: Vec<f64>,
    pub resd_real: Vec<f64>,
    pub resd_imag: Vec<f64>,
}

impl Sample {
    fn new(
        sol: &PowerFlowSolution,
        v_init: Vec<f64>,
        theta_init: Vec<f64>,
        iterations: usize,
    ) -> Result<Self, ResidualError> {
        let resd = compute_residual(
            &sol.vm_pu,
            &sol.va_degree,
            &sol.y_bus,
            &sol.s_bus,
            &sol.ref_buses,
        )?;

        // column-major storage of the transpose is row-major Ybus
        let y_rows: Vec<_> = sol.y_bus.transpose().iter().copied().collect();

        Ok(Self {
            p: sol.s_bus.iter().map(|s| s.re).collect(),
            q: sol.s_bus.iter().map(|s| s.im).collect(),
            g: y_rows.iter().map(|y| y.re).collect(),
            b: y_rows.iter().map(|y| y.im).collect(),
            v_init,
            theta_init,
            iterations,
            v_pred: sol.vm_pu.clone(),
            phi_pred: sol.va_degree.clone(),
            resd_real: resd.iter().map(|r| r.re).collect(),
            resd_imag: resd.iter().map(|r| r.im).collect(),
        })
    }

    /// Concatenates the numeric fields into one row with the iteration
    /// count last.
    pub fn flatten(&self) -> Vec<f64> {
        let mut row: Vec<f64> = [
            &self.p,
            &self.q,
            &self.g,
            &self.b,
            &self.v_init,
            &self.theta_init,
            &self.v_pred,
            &self.phi_pred,
            &self.resd_real,
            &self.resd_imag,
        ]
        .iter()
        .flat_map(|v| v.iter().copied())
        .collect();
        row.push(self.iterations as f64);
        row
    }
}

/// Samples drawn from one base case.
#[derive(Debug, Clone)]
pub struct SampleSet {
    pub samples: Vec<Sample>,
    pub requested: usize,
    pub discarded: usize,
    /// Iterations of the base case solve.
    pub base_iterations: usize,
}

impl SampleSet {
    pub fn retained(&self) -> usize {
        self.samples.len()
    }
}

/// Draws one value per bus uniformly within `radius` of the base value.
fn perturb<R: Rng + ?Sized>(base: &[f64], radius: f64, rng: &mut R) -> Vec<f64> {
    let radius = radius.abs();
    let dist = Uniform::new_inclusive(-radius, radius);
    base.iter().map(|x| x + dist.sample(rng)).collect()
}

/// Generates ill-conditioned samples around the solution of `base_net`.
///
/// The base case is solved from a flat start. Each sample restarts the
/// solver from the base solution with every bus magnitude and angle
/// perturbed uniformly within the configured radii. Restarts that fail
/// to converge are logged and discarded.
pub fn generate_samples<S, R>(
    base_net: &Network,
    config: &PerturbationConfig,
    solver: &S,
    rng: &mut R,
) -> Result<SampleSet, SamplerError>
where
    S: PowerFlowSolver + ?Sized,
    R: Rng + ?Sized,
{
    config.validate()?;

    // run a normal power flow first
    let base = solver
        .solve(base_net, &InitialGuess::Flat, &config.base_opt())
        .map_err(SamplerError::BaseCase)?;
    log::debug!(
        "{}: base case solved in {} iterations",
        base_net.name,
        base.iterations
    );

    let v_nominal = &base.vm_pu;
    let theta_nominal = &base.va_degree;
    let opt = config.sample_opt();

    let mut samples = Vec::with_capacity(config.num_samples);
    let mut discarded = 0;

    for index in 0..config.num_samples {
        // create an ill-conditioned case
        let v_ill = perturb(v_nominal, config.v_perturb, rng);
        let theta_ill = perturb(theta_nominal, config.theta_perturb, rng);

        let init = InitialGuess::Custom {
            vm_pu: v_ill.clone(),
            va_degree: theta_ill.clone(),
        };
        match solver.solve(base_net, &init, &opt) {
            Ok(sol) => {
                let iterations = match config.iteration_source {
                    IterationSource::Base => base.iterations,
                    IterationSource::Perturbed => sol.iterations,
                };
                log::trace!("Sample {}: {} iterations", index, sol.iterations);
                samples.push(Sample::new(&sol, v_ill, theta_ill, iterations)?);
            }
            Err(err) if err.is_non_convergence() => {
                log::warn!("Sample {} discarded: {}", index, err);
                discarded += 1;
            }
            Err(source) => return Err(SamplerError::Solver { index, source }),
        }
    }

    log::info!(
        "{}: kept {} of {} samples",
        base_net.name,
        samples.len(),
        config.num_samples
    );

    Ok(SampleSet {
        samples,
        requested: config.num_samples,
        discarded,
        base_iterations: base.iterations,
    })
}
