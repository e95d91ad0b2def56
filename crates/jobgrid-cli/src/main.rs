use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod jobfile;

#[derive(Parser)]
#[command(
    name = "jobgrid",
    about = "JobGrid — node-local resource placement for the batch scheduler",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the machine hierarchy for a topology description
    Topology {
        /// Path to a topology description (TOML)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Plan a job placement against a topology description.
    ///
    /// Builds the machine, reserves resources for every task group of the
    /// job, and prints the resulting cpu/memory affinity range strings.
    /// A job that does not fit is rolled back and reported as an error.
    Place {
        /// Path to a topology description (TOML)
        #[arg(short, long)]
        file: PathBuf,
        /// Path to a job description (TOML)
        #[arg(short, long)]
        job: PathBuf,
        /// Node configuration file; built-in defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the packing policy (threads or cores)
        #[arg(short, long)]
        policy: Option<String>,
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jobgrid=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Topology { file } => commands::topology::show(&file),
        Commands::Place {
            file,
            job,
            config,
            policy,
            format,
        } => commands::place::plan(&file, &job, config.as_deref(), policy.as_deref(), &format),
    }
}
