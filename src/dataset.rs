use crate::cases::{two_bus, TwoBusParams};
use crate::sampler::{generate_samples, PerturbationConfig, SamplerError};
use crate::solver::PowerFlowSolver;

use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("row {row} has {got} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("{name} range [{lo}, {hi}] is not finite")]
    InvalidRange {
        name: &'static str,
        lo: f64,
        hi: f64,
    },

    #[error("grid {grid}: {source}")]
    Sampler {
        grid: usize,
        #[source]
        source: SamplerError,
    },
}

/// Dense row-major matrix of flattened samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetArray {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl DatasetArray {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, DatasetError> {
        let cols = rows.first().map(|r| r.len()).unwrap_or_default();
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, r) in rows.iter().enumerate() {
            if r.len() != cols {
                return Err(DatasetError::Ragged {
                    row: i,
                    expected: cols,
                    got: r.len(),
                });
            }
            data.extend_from_slice(r);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Uniform parameter ranges of the random two-bus grids.
#[derive(Debug, Clone)]
pub struct GridSampling {
    pub vm_pu: [f64; 2],
    pub p_mw: [f64; 2],
    pub q_mvar: [f64; 2],
    pub g: [f64; 2],
    pub b: [f64; 2],
    pub init_vm_pu: [f64; 2],
    /// Initial angle range (degrees). The bounds may be given in either
    /// order.
    pub init_theta: [f64; 2],
    pub samples_per_grid: usize,
}

impl Default for GridSampling {
    fn default() -> Self {
        Self {
            vm_pu: [0.9, 1.1],
            p_mw: [0.0, 0.2],
            q_mvar: [0.0, 0.1],
            g: [80.0, 120.0],
            b: [0.01, 0.2],
            init_vm_pu: [0.9, 1.1],
            init_theta: [1.0, -1.0],
            samples_per_grid: 10,
        }
    }
}

fn uniform<R: Rng + ?Sized>(range: [f64; 2], rng: &mut R) -> f64 {
    let (lo, hi) = if range[0] <= range[1] {
        (range[0], range[1])
    } else {
        (range[1], range[0])
    };
    if lo == hi {
        return lo;
    }
    rng.gen_range(lo..hi)
}

impl GridSampling {
    /// Rejects ranges that cannot be sampled.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let ranges = [
            ("vm_pu", self.vm_pu),
            ("p_mw", self.p_mw),
            ("q_mvar", self.q_mvar),
            ("g", self.g),
            ("b", self.b),
            ("init_vm_pu", self.init_vm_pu),
            ("init_theta", self.init_theta),
        ];
        for (name, [lo, hi]) in ranges {
            if !(hi - lo).is_finite() {
                return Err(DatasetError::InvalidRange { name, lo, hi });
            }
        }
        Ok(())
    }

    /// Draws the parameters of one two-bus grid.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> TwoBusParams {
        let v_ext = uniform(self.vm_pu, rng);
        let p = uniform(self.p_mw, rng);
        let q = uniform(self.q_mvar, rng);
        let g = uniform(self.g, rng);
        let b = uniform(self.b, rng);
        let v_init = [(); 2].map(|_| uniform(self.init_vm_pu, rng));
        let theta_init = [(); 2].map(|_| uniform(self.init_theta, rng));
        TwoBusParams {
            v_ext,
            p,
            q,
            g,
            b,
            v_init,
            theta_init,
        }
    }
}

/// Samples `grid_num` random two-bus grids and flattens every retained
/// sample into one row. Grids whose base case does not solve are
/// skipped.
pub fn create_grid_dataset<S, R>(
    grid_num: usize,
    sampling: &GridSampling,
    perturbation: &PerturbationConfig,
    solver: &S,
    rng: &mut R,
) -> Result<DatasetArray, DatasetError>
where
    S: PowerFlowSolver + ?Sized,
    R: Rng + ?Sized,
{
    sampling.validate()?;
    let config = PerturbationConfig {
        num_samples: sampling.samples_per_grid,
        ..perturbation.clone()
    };

    let mut flattened_data = Vec::new();
    let mut skipped = 0;
    for grid in 0..grid_num {
        let params = sampling.draw(rng);
        let net = two_bus(&params);

        match generate_samples(&net, &config, solver, rng) {
            Ok(set) => {
                flattened_data.extend(set.samples.iter().map(|s| s.flatten()));
            }
            Err(SamplerError::BaseCase(err)) => {
                log::warn!("Grid {}: base case did not converge: {}", grid, err);
                skipped += 1;
            }
            Err(source) => return Err(DatasetError::Sampler { grid, source }),
        }
        if (grid + 1) % 10 == 0 || grid + 1 == grid_num {
            log::info!(
                "{}/{} grids, {} rows",
                grid + 1,
                grid_num,
                flattened_data.len()
            );
        }
    }
    if skipped > 0 {
        log::warn!("{} of {} grids skipped", skipped, grid_num);
    }

    DatasetArray::from_rows(flattened_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::AcPowerFlow;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ragged_rows_are_rejected() {
        let err = DatasetArray::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Ragged {
                row: 1,
                expected: 2,
                got: 1
            }
        ));
        let empty = DatasetArray::from_rows(Vec::new()).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.shape(), (0, 0));
    }

    #[test]
    fn draws_within_ranges() {
        let sampling = GridSampling::default();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let p = sampling.draw(&mut rng);
            assert!((0.9..1.1).contains(&p.v_ext));
            assert!((80.0..120.0).contains(&p.g));
            assert!(p.theta_init.iter().all(|t| (-1.0..1.0).contains(t)));
        }
    }

    #[test]
    fn unbounded_ranges_are_rejected() {
        let solver = AcPowerFlow::default();
        let perturbation = PerturbationConfig::default();
        let mut rng = StdRng::seed_from_u64(0);

        let sampling = GridSampling {
            init_theta: [f64::NAN, 1.0],
            ..Default::default()
        };
        let err = create_grid_dataset(1, &sampling, &perturbation, &solver, &mut rng);
        assert!(matches!(
            err,
            Err(DatasetError::InvalidRange {
                name: "init_theta",
                ..
            })
        ));

        let sampling = GridSampling {
            g: [-f64::MAX, f64::MAX],
            ..Default::default()
        };
        assert!(sampling.validate().is_err());
        assert!(GridSampling::default().validate().is_ok());
    }

    #[test]
    fn rows_have_fixed_width() {
        let sampling = GridSampling {
            samples_per_grid: 3,
            ..Default::default()
        };
        let perturbation = PerturbationConfig {
            tolerance_mva: 1e-5,
            ..Default::default()
        };
        let solver = AcPowerFlow::default();
        let mut rng = StdRng::seed_from_u64(42);
        let data = create_grid_dataset(4, &sampling, &perturbation, &solver, &mut rng).unwrap();
        assert!(data.rows <= 12);
        assert!(data.rows > 0);
        assert_eq!(data.cols, 23);
        // the label is a whole iteration count
        let label = data.row(0)[22];
        assert_eq!(label.fract(), 0.0);
        assert!(label >= 1.0);
    }
}
