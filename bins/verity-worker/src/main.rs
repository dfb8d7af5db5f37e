mod executor;
mod scoring;

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::signal;
use tracing::{debug, error, info, warn};

use verity_common::config::{LanguageConfigManager, RunConfig};
use verity_common::types::JudgeJob;
use verity_eval::{ProcessRunner, RunContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Verity worker booting...");

    let config_path = env_path("VERITY_CONFIG", "config/run.json");
    let config = RunConfig::load(&config_path).map_err(|e| {
        error!("Failed to load run configuration: {}", e);
        error!("Set VERITY_CONFIG or create config/run.json");
        e
    })?;
    info!(
        resources = %config.resources.display(),
        workdir = %config.workdir.display(),
        time_limit = config.time_limit,
        language = %config.natural_language,
        "Run configuration loaded"
    );

    let languages_path = env_path("VERITY_LANGUAGES", "config/languages.json");
    let languages = match LanguageConfigManager::load(&languages_path) {
        Ok(languages) => {
            info!("Loaded language configurations for: {:?}", languages.list_languages());
            languages
        }
        Err(e) => {
            warn!("No language configurations loaded ({}); custom evaluators will fail", e);
            LanguageConfigManager::default()
        }
    };

    let job = read_job().await?;
    info!(job_id = %job.id, testcases = job.testcases.len(), "Received job");

    let runner = Arc::new(ProcessRunner::new(languages, config.resources.clone()));
    let ctx = RunContext::new(config, runner);

    // Setup graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
        warn!("Received shutdown signal, abandoning job");
    };

    tokio::select! {
        report = executor::execute_job(&ctx, &job) => {
            debug!(job_id = %report.job_id, "Writing report");
            println!("{}", serde_json::to_string_pretty(&report).context("Failed to serialize report")?);
        }
        _ = shutdown => {}
    }

    info!("Worker shutdown complete");
    Ok(())
}

fn env_path(variable: &str, default: &str) -> PathBuf {
    PathBuf::from(std::env::var(variable).unwrap_or_else(|_| default.to_string()))
}

/// Read the job from VERITY_JOB, or from stdin when unset or "-"
async fn read_job() -> anyhow::Result<JudgeJob> {
    let content = match std::env::var("VERITY_JOB") {
        Ok(path) if path != "-" => tokio::fs::read_to_string(Path::new(&path))
            .await
            .with_context(|| format!("Failed to read job file {}", path))?,
        _ => {
            let mut content = String::new();
            tokio::io::stdin()
                .read_to_string(&mut content)
                .await
                .context("Failed to read job from stdin")?;
            content
        }
    };
    serde_json::from_str(&content).context("Failed to parse job")
}
