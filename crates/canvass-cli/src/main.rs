//! canvass CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "canvass", version, about = "Form definition & response processing engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate form definition TOML files
    Validate {
        /// Path to a .toml form definition or directory
        #[arg(long)]
        form: PathBuf,
    },

    /// Dry-run a submission against a form definition
    Submit {
        /// Path to a .toml form definition
        #[arg(long)]
        form: PathBuf,

        /// JSON submission payload
        #[arg(long)]
        payload: PathBuf,

        /// Submission instant (RFC 3339, defaults to now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Aggregate analytics from a response dump
    Stats {
        /// Path to a .toml form definition
        #[arg(long)]
        form: PathBuf,

        /// JSON array of stored responses
        #[arg(long)]
        responses: PathBuf,

        /// Trailing window in days
        #[arg(long, default_value = "30")]
        days: u32,

        /// Write the report JSON here
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Summarize a response dump with the configured AI backend
    Insight {
        /// Path to a .toml form definition
        #[arg(long)]
        form: PathBuf,

        /// JSON array of stored responses
        #[arg(long)]
        responses: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and an example form
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("canvass=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { form } => commands::validate::execute(form),
        Commands::Submit { form, payload, at } => {
            commands::submit::execute(form, payload, at).await
        }
        Commands::Stats {
            form,
            responses,
            days,
            output,
        } => commands::stats::execute(form, responses, days, output),
        Commands::Insight {
            form,
            responses,
            config,
        } => commands::insight::execute(form, responses, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
