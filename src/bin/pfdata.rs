use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use itertools::izip;
use pfdata::cases::{meshed_grid, two_bus, TwoBusParams};
use pfdata::dataset::{create_grid_dataset, GridSampling};
use pfdata::io::{write_npy, write_samples_json};
use pfdata::sampler::{generate_samples, IterationSource, PerturbationConfig};
use pfdata::solver::{AcPowerFlow, PowerFlowSolver};
use pfdata::topology::RingConfig;
use pfdata::{Alg, InitialGuess, PFOpt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

/// Synthetic power flow datasets from perturbed AC power flow restarts.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the two-bus benchmark and write JSON records
    TwoBus(TwoBusArgs),

    /// Sample random two-bus grids and write a .npy array
    GridDataset(GridArgs),

    /// Solve the ring/mesh grid and print the bus results
    Meshed(MeshedArgs),
}

#[derive(Args)]
struct SampleArgs {
    /// Random seed. Drawn from the OS when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of perturbed restarts.
    #[arg(long)]
    samples: Option<usize>,

    /// Maximum number of iterations of a perturbed restart.
    #[arg(long)]
    max_it: Option<usize>,

    /// Termination tolerance on P & Q mismatch (MVA).
    #[arg(long)]
    tol: Option<f64>,

    /// Voltage magnitude perturbation radius (p.u.).
    #[arg(long)]
    v_perturb: Option<f64>,

    /// Voltage angle perturbation radius (degrees).
    #[arg(long)]
    theta_perturb: Option<f64>,

    /// AC power flow algorithm.
    #[arg(long)]
    alg: Option<Alg>,

    /// Label samples with the iterations of their own restart instead of
    /// the base case.
    #[arg(long, default_value_t = false)]
    perturbed_iterations: bool,

    /// Log the mismatch of every iteration.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl SampleArgs {
    fn tolerance(&self) -> Result<Option<f64>> {
        if let Some(tol) = self.tol {
            ensure!(tol.is_finite() && tol > 0.0, "invalid tolerance: {}", tol);
        }
        Ok(self.tol)
    }

    fn config(&self) -> Result<PerturbationConfig> {
        let mut config = PerturbationConfig::default();
        if let Some(samples) = self.samples {
            config.num_samples = samples;
        }
        if let Some(max_it) = self.max_it {
            config.max_iteration = max_it;
        }
        if let Some(tol) = self.tolerance()? {
            config.tolerance_mva = tol;
        }
        if let Some(v) = self.v_perturb {
            config.v_perturb = v;
        }
        if let Some(theta) = self.theta_perturb {
            config.theta_perturb = theta;
        }
        if let Some(alg) = self.alg {
            config.algorithm = alg;
        }
        if self.perturbed_iterations {
            config.iteration_source = IterationSource::Perturbed;
        }
        config.validate()?;
        Ok(config)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn solver(&self) -> AcPowerFlow {
        AcPowerFlow {
            verbose: self.verbose,
        }
    }
}

#[derive(Args)]
struct TwoBusArgs {
    #[command(flatten)]
    sample: SampleArgs,

    /// External grid voltage (p.u.).
    #[arg(long, default_value_t = 1.02)]
    v_ext: f64,

    /// Load active power (MW).
    #[arg(long, default_value_t = 0.1)]
    p: f64,

    /// Load reactive power (MVAr).
    #[arg(long, default_value_t = 0.05)]
    q: f64,

    /// Output file
    #[arg(short, long, default_value = "two_bus_samples.json")]
    output: PathBuf,
}

#[derive(Args)]
struct GridArgs {
    #[command(flatten)]
    sample: SampleArgs,

    /// Number of random grids.
    #[arg(long, default_value_t = 100)]
    grids: usize,

    /// Output file
    #[arg(short, long, default_value = "grid_dataset.npy")]
    output: PathBuf,
}

#[derive(Args)]
struct MeshedArgs {
    #[command(flatten)]
    sample: SampleArgs,

    /// Number of rings.
    #[arg(long, default_value_t = 2)]
    rings: usize,

    /// Buses per ring.
    #[arg(long, default_value_t = 4)]
    buses_per_ring: usize,

    /// Number of meshed rings.
    #[arg(long, default_value_t = 1)]
    meshes: usize,

    /// Write perturbed samples of the grid to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_level(false)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match execute(&cli) {
        Ok(_) => {
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(2);
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::TwoBus(args) => run_two_bus(args),
        Commands::GridDataset(args) => run_grid_dataset(args),
        Commands::Meshed(args) => run_meshed(args),
    }
}

fn run_two_bus(args: &TwoBusArgs) -> Result<()> {
    let params = TwoBusParams {
        v_ext: args.v_ext,
        p: args.p,
        q: args.q,
        ..Default::default()
    };
    let net = two_bus(&params);
    let config = args.sample.config()?;
    let mut rng = args.sample.rng();

    let set = generate_samples(&net, &config, &args.sample.solver(), &mut rng)?;
    println!(
        "{} of {} samples retained ({} discarded), base case {} iterations",
        set.retained(),
        set.requested,
        set.discarded,
        set.base_iterations
    );

    write_samples_json(&args.output, &set.samples)
}

fn run_grid_dataset(args: &GridArgs) -> Result<()> {
    let mut sampling = GridSampling::default();
    if let Some(samples) = args.sample.samples {
        sampling.samples_per_grid = samples;
    }
    let config = args.sample.config()?;
    let mut rng = args.sample.rng();

    let data = create_grid_dataset(
        args.grids,
        &sampling,
        &config,
        &args.sample.solver(),
        &mut rng,
    )
    .context("generating grid dataset")?;
    println!("dataset shape: ({}, {})", data.rows, data.cols);

    write_npy(&args.output, &data)
}

fn run_meshed(args: &MeshedArgs) -> Result<()> {
    let ring = RingConfig {
        n_rings: args.rings,
        buses_per_ring: args.buses_per_ring,
        n_meshes: args.meshes,
        ..Default::default()
    };
    let (net, topo) = meshed_grid(&ring);
    log::info!("{}: {} buses", net.name, net.n_bus());

    let mut opt = PFOpt::default();
    if let Some(alg) = args.sample.alg {
        opt.algorithm = alg;
    }
    if let Some(tol) = args.sample.tolerance()? {
        opt.tolerance = tol;
    }
    let solver = args.sample.solver();
    let sol = solver.solve(&net, &InitialGuess::Flat, &opt)?;
    log::info!("Solved in {:?}", sol.elapsed);

    println!("Converged in {} iterations", sol.iterations);
    println!("{:>5} {:>10} {:>12}", "bus", "vm_pu", "va_degree");
    for (bus, vm, va) in izip!(&sol.bus_index, &sol.vm_pu, &sol.va_degree) {
        println!("{:>5} {:>10.6} {:>12.6}", bus, vm, va);
    }
    log::debug!("ring buses: {:?}", topo.buses);

    if let Some(out_path) = &args.output {
        let config = args.sample.config()?;
        let mut rng = args.sample.rng();
        let set = generate_samples(&net, &config, &solver, &mut rng)?;
        println!(
            "{} of {} samples retained ({} discarded)",
            set.retained(),
            set.requested,
            set.discarded
        );
        write_samples_json(out_path, &set.samples)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_args(args: &[&str]) -> SampleArgs {
        let argv = ["pfdata", "two-bus"].iter().chain(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::TwoBus(args) => args.sample,
            _ => unreachable!(),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let args = sample_args(&["--samples", "7", "--alg", "gs"]);
        let config = args.config().unwrap();
        assert_eq!(config.num_samples, 7);
        assert_eq!(config.algorithm, Alg::GS);
        assert_eq!(config.v_perturb, PerturbationConfig::default().v_perturb);
    }

    #[test]
    fn non_finite_flags_are_rejected() {
        assert!(sample_args(&["--theta-perturb", "nan"]).config().is_err());
        assert!(sample_args(&["--v-perturb", "inf"]).config().is_err());
        assert!(sample_args(&["--tol", "nan"]).config().is_err());
        assert!(sample_args(&["--tol=-1"]).tolerance().is_err());
    }
}
