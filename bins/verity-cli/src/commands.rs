// CLI commands for preparing and inspecting Verity jobs
use anyhow::{bail, Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use verity_common::config::{LanguageConfig, LanguageConfigManager, LanguageExecution, RunConfig};
use verity_common::display::abbreviate;
use verity_common::types::{ChannelKind, JudgeJob};
use verity_common::value::{ExceptionValue, Value};
use verity_eval::{get_evaluator, ProcessRunner, RunContext};

/// A channel whose evaluator could not be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelProblem {
    pub testcase: u32,
    pub channel: ChannelKind,
    pub error: String,
}

/// Initialize a new Verity project
pub async fn init_project(path: &str) -> Result<()> {
    println!("🚀 Initializing Verity project at: {}", path);

    let project_path = Path::new(path);

    let dirs = ["config", "jobs", "resources"];
    for dir in &dirs {
        fs::create_dir_all(project_path.join(dir))
            .with_context(|| format!("Failed to create directory: {}", dir))?;
        println!("  ✅ Created: {}", dir);
    }

    let run_config = serde_json::to_string_pretty(&RunConfig::new("resources", "."))
        .context("Failed to serialize run.json")?;
    write_if_missing(project_path, "config/run.json", &run_config)?;

    let languages = LanguageConfigManager::from_configs(default_languages()).to_json()?;
    write_if_missing(project_path, "config/languages.json", &languages)?;

    let sample = serde_json::to_string_pretty(&sample_job()).context("Failed to serialize sample job")?;
    write_if_missing(project_path, "jobs/sample.json", &sample)?;

    println!("✅ Project initialized successfully!");
    println!("\n📋 Next steps:");
    println!("  1. Put expected files and evaluator programs in resources/");
    println!("  2. Check a job: verity-cli check --job jobs/sample.json");
    println!("  3. Evaluate it: VERITY_JOB=jobs/sample.json verity-worker");

    Ok(())
}

fn write_if_missing(project_path: &Path, relative: &str, content: &str) -> Result<()> {
    let target = project_path.join(relative);
    if target.exists() {
        println!("  ⏭️  Kept existing: {}", relative);
        return Ok(());
    }
    fs::write(&target, content).with_context(|| format!("Failed to write {}", relative))?;
    println!("  ✅ Created: {}", relative);
    Ok(())
}

fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            name: "python".to_string(),
            version: "3".to_string(),
            execution: LanguageExecution {
                command: "python3".to_string(),
                args: vec!["-u".to_string()],
                file_extension: ".py".to_string(),
            },
        },
        LanguageConfig {
            name: "bash".to_string(),
            version: String::new(),
            execution: LanguageExecution {
                command: "bash".to_string(),
                args: vec![],
                file_extension: ".sh".to_string(),
            },
        },
    ]
}

fn sample_job() -> serde_json::Value {
    json!({
        "id": "6f1c2d0e-8a4b-4c3d-9e2f-1a2b3c4d5e6f",
        "language": "python",
        "testcases": [
            {
                "id": 1,
                "description": "factorial(5) printed on stdout",
                "weight": 10,
                "output": {
                    "stdout": {
                        "data": "120",
                        "evaluator": {"type": "builtin", "name": "text", "options": {"tryFloatingPoint": true}}
                    },
                    "exit_code": {"value": 0}
                },
                "captured": {"stdout": "120\n", "exit_code": 0}
            },
            {
                "id": 2,
                "description": "factorial(5) returned",
                "weight": 10,
                "output": {
                    "result": {"value": {"type": "integer", "data": 120}}
                },
                "captured": {"result": "{\"type\": \"integer\", \"data\": 120}"}
            }
        ]
    })
}

/// Resolve every declared channel of a job and report those that fail
pub async fn check_job(job_path: &str, config_path: &str) -> Result<()> {
    println!("🔍 Checking job: {}", job_path);

    let config = RunConfig::load(Path::new(config_path))?;
    let content = fs::read_to_string(job_path).with_context(|| format!("Failed to read {}", job_path))?;
    let job: JudgeJob = serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", job_path))?;

    let runner = Arc::new(ProcessRunner::new(
        LanguageConfigManager::default(),
        config.resources.clone(),
    ));
    let ctx = RunContext::new(config, runner);

    let problems = check_channels(&ctx, &job);
    if problems.is_empty() {
        println!("✅ All {} testcase(s) resolve to an evaluator", job.testcases.len());
        return Ok(());
    }

    for problem in &problems {
        println!("  ❌ testcase {} / {}: {}", problem.testcase, problem.channel, problem.error);
    }
    bail!("{} channel(s) cannot be evaluated", problems.len())
}

pub fn check_channels(ctx: &RunContext, job: &JudgeJob) -> Vec<ChannelProblem> {
    let mut problems = Vec::new();
    for testcase in &job.testcases {
        let output = &testcase.output;
        let channels = [
            (ChannelKind::Stdout, output.stdout.as_channel()),
            (ChannelKind::Stderr, output.stderr.as_channel()),
            (ChannelKind::File, output.file.as_channel()),
            (ChannelKind::Exception, output.exception.as_channel()),
            (ChannelKind::Result, output.result.as_channel()),
        ];
        for (channel, expected) in channels {
            match get_evaluator(ctx, expected) {
                Ok(evaluator) => debug!(testcase = testcase.id, %channel, evaluator = evaluator.name(), "Resolved"),
                Err(e) => problems.push(ChannelProblem {
                    testcase: testcase.id,
                    channel,
                    error: e.to_string(),
                }),
            }
        }
    }
    problems
}

/// Readable form of a serialized value or exception
pub fn render(input: &str, exception: bool, full: bool) -> Result<String> {
    let readable = if exception {
        ExceptionValue::parse(input).context("Not a serialized exception")?.readable()
    } else {
        Value::parse(input).context("Not a serialized value")?.readable()
    };
    Ok(if full { readable } else { abbreviate(&readable) })
}

/// List configured languages
pub fn list_languages(config_path: &str) -> Result<()> {
    let manager = LanguageConfigManager::load(Path::new(config_path))?;
    let languages = manager.list_languages();
    if languages.is_empty() {
        println!("No languages configured in {}", config_path);
        return Ok(());
    }

    println!("📋 Languages ({}):", languages.len());
    for name in &languages {
        let config = manager.get_config(name)?;
        let mut command = config.execution.command.clone();
        for arg in &config.execution.args {
            command.push(' ');
            command.push_str(arg);
        }
        println!("  • {} ({}) → {} <program{}>", name, config.version, command, config.execution.file_extension);
    }
    Ok(())
}
