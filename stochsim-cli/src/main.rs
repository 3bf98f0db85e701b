mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args as ClapArgs, Parser, Subcommand};
use runner::{RunPlan, run_batches};
use stochsim_core::{HeatParams, ReactionParams, WaveParams};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    solver: Solver,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "stochsim_core=debug")
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Solver {
    /// 1-D stochastic heat equation
    Heat(RunArgs),
    /// 1-D damped stochastic wave equation
    Wave(RunArgs),
    /// 2-D Gray-Scott reaction-diffusion
    Reaction(RunArgs),
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// JSON parameter record ("-" reads stdin)
    #[arg(long, default_value = "-")]
    params: String,

    /// Output directory (batch_NNNN.json + meta.jsonl)
    #[arg(long)]
    out: PathBuf,

    /// Number of chained calls, each resuming from the previous one
    #[arg(long, default_value_t = 1)]
    batches: usize,

    /// Response file of an earlier run to continue from
    #[arg(long)]
    resume_from: Option<PathBuf>,

    /// Base RNG seed (reproducibility); drawn from the OS when omitted
    #[arg(long)]
    seed: Option<u64>,
}

impl RunArgs {
    fn plan(&self) -> RunPlan {
        RunPlan {
            params: self.params.clone(),
            out: self.out.clone(),
            batches: self.batches,
            resume_from: self.resume_from.clone(),
            base_seed: self.seed.unwrap_or_else(rand::random),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match &args.solver {
        Solver::Heat(run) => run_batches::<HeatParams>(&run.plan()),
        Solver::Wave(run) => run_batches::<WaveParams>(&run.plan()),
        Solver::Reaction(run) => run_batches::<ReactionParams>(&run.plan()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
