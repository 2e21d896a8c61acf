use clap::ValueEnum;

#[derive(Debug, PartialEq, Copy, Clone, ValueEnum)]
pub enum Alg {
    /// Newton's method (power balance, polar).
    NR = 0,
    /// Gauss-Seidel method.
    GS = 3,
}

#[derive(Debug, Clone)]
pub struct PFOpt {
    // AC power flow algorithm.
    pub algorithm: Alg,

    // Termination tolerance on P & Q mismatch (MVA). Default value is 1e-8.
    pub tolerance: f64,

    // Maximum number of iterations for Newton's method. Default value is 10.
    pub max_it_nr: usize,
    // Maximum number of iterations for Gauss-Seidel method. Default value is 1000.
    pub max_it_gs: usize,
}

impl PFOpt {
    /// Iteration cap of the selected algorithm.
    pub fn max_it(&self) -> usize {
        match self.algorithm {
            Alg::NR => self.max_it_nr,
            Alg::GS => self.max_it_gs,
        }
    }

    /// Returns a copy with the cap of the selected algorithm replaced.
    pub fn with_max_it(&self, max_it: usize) -> Self {
        let mut opt = self.clone();
        match opt.algorithm {
            Alg::NR => opt.max_it_nr = max_it,
            Alg::GS => opt.max_it_gs = max_it,
        }
        opt
    }

    pub fn with_tolerance(&self, tolerance: f64) -> Self {
        Self {
            tolerance,
            ..self.clone()
        }
    }
}

impl Default for PFOpt {
    fn default() -> Self {
        Self {
            algorithm: Alg::NR,
            tolerance: 1e-8,
            max_it_nr: 10,
            max_it_gs: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_it_follows_algorithm() {
        let nr = PFOpt::default().with_max_it(50);
        assert_eq!(nr.max_it(), 50);
        assert_eq!(nr.max_it_gs, 1000);

        let gs = PFOpt {
            algorithm: Alg::GS,
            ..Default::default()
        }
        .with_max_it(200);
        assert_eq!(gs.max_it(), 200);
        assert_eq!(gs.max_it_nr, 10);
    }
}
