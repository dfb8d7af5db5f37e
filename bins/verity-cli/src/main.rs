mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "verity-cli")]
#[command(about = "Verity CLI - Prepare configurations and inspect judge jobs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Verity project
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: String,
    },

    /// Check that every channel of a job resolves to an evaluator
    Check {
        /// Job file
        #[arg(short, long)]
        job: String,

        /// Run configuration
        #[arg(short, long, default_value = "config/run.json")]
        config: String,
    },

    /// Print the readable form of a serialized value or exception
    Render {
        /// Serialized value, e.g. {"type": "integer", "data": 5}
        input: String,

        /// Decode the input as an exception
        #[arg(short, long, default_value = "false")]
        exception: bool,

        /// Print the full rendering instead of an abbreviation
        #[arg(long, default_value = "false")]
        full: bool,
    },

    /// List the languages custom evaluators can be written in
    Languages {
        /// Language configuration
        #[arg(short, long, default_value = "config/languages.json")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => {
            commands::init_project(&path).await?;
        }
        Commands::Check { job, config } => {
            commands::check_job(&job, &config).await?;
        }
        Commands::Render {
            input,
            exception,
            full,
        } => {
            println!("{}", commands::render(&input, exception, full)?);
        }
        Commands::Languages { config } => {
            commands::list_languages(&config)?;
        }
    }

    Ok(())
}
