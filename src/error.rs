use thiserror::Error;

/// Power flow failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PowerFlowError {
    /// Iteration cap reached before the mismatch fell below tolerance.
    #[error("not converged in {iterations} iterations ({mismatch:e} MVA)")]
    NotConverged { iterations: usize, mismatch: f64 },

    /// The Newton update could not be computed.
    #[error("singular Jacobian at iteration {0}")]
    Singular(usize),

    #[error("network has no in-service external grid")]
    NoReferenceBus,

    #[error("network has no buses")]
    EmptyNetwork,

    #[error("{element} references unknown bus {bus}")]
    UnknownBus { element: &'static str, bus: usize },

    #[error("duplicate bus index {0}")]
    DuplicateBus(usize),

    #[error("initial guess has {got} values, network has {expected} buses")]
    InitLength { expected: usize, got: usize },
}

impl PowerFlowError {
    /// True for failures of the iteration itself, as opposed to a
    /// malformed network.
    pub fn is_non_convergence(&self) -> bool {
        matches!(
            self,
            PowerFlowError::NotConverged { .. } | PowerFlowError::Singular(_)
        )
    }
}
