// Run and language configuration for Verity
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

fn default_time_limit() -> u64 {
    10
}

fn default_natural_language() -> String {
    "en".to_string()
}

fn default_output_limit() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Evaluate the testcases of a job concurrently.
    #[serde(default)]
    pub parallel: bool,
    /// Replacement texts for catalog messages, keyed by message key.
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

/// Settings of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding exercise resources (expected files, judges).
    pub resources: PathBuf,
    /// Directory the submission ran in; actual output files live here.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    /// Seconds
    #[serde(default = "default_time_limit")]
    pub time_limit: u64,
    /// Bytes
    #[serde(default = "default_natural_language")]
    pub natural_language: String,
    /// Language of the submission; selects the entry of a specific evaluator.
    #[serde(default)]
    pub programming_language: String,
    /// Bytes of stdout or stderr beyond which a testcase exceeds its output limit.
    #[serde(default = "default_output_limit")]
    pub output_limit: usize,
    #[serde(default)]
    pub options: RunOptions,
}

impl RunConfig {
    pub fn new(resources: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            resources: resources.into(),
            workdir: workdir.into(),
            time_limit: default_time_limit(),
            natural_language: default_natural_language(),
            programming_language: String::new(),
            output_limit: default_output_limit(),
            options: RunOptions::default(),
        }
    }

    /// Load a run configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Run config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageExecution {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub file_extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub execution: LanguageExecution,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Commands used to run exercise-supplied evaluator programs, per language
#[derive(Debug, Clone, Default)]
pub struct LanguageConfigManager {
    configs: HashMap<String, LanguageConfig>,
}

impl LanguageConfigManager {
    /// Load language configurations from languages.json
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path).context("Failed to read languages.json")?;

        let languages_json: LanguagesJson =
            serde_json::from_str(&content).context("Failed to parse languages.json")?;

        Ok(Self::from_configs(languages_json.languages))
    }

    pub fn from_configs(languages: impl IntoIterator<Item = LanguageConfig>) -> Self {
        let configs = languages
            .into_iter()
            .map(|config| (config.name.clone(), config))
            .collect();
        Self { configs }
    }

    pub fn get_config(&self, language: &str) -> Result<&LanguageConfig> {
        self.configs
            .get(language)
            .ok_or_else(|| anyhow::anyhow!("No configuration found for language: {}", language))
    }

    /// List all configured languages, sorted
    pub fn list_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.configs.keys().cloned().collect();
        languages.sort();
        languages
    }

    /// Serialize back to the languages.json layout
    pub fn to_json(&self) -> Result<String> {
        let mut languages: Vec<LanguageConfig> = self.configs.values().cloned().collect();
        languages.sort_by(|a, b| a.name.cmp(&b.name));
        serde_json::to_string_pretty(&LanguagesJson { languages }).context("Failed to serialize languages")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANGUAGES: &str = r#"{
        "languages": [
            {"name": "python", "version": "3.12", "execution": {"command": "python3", "args": ["-u"], "file_extension": ".py"}},
            {"name": "shell", "execution": {"command": "sh", "file_extension": ".sh"}}
        ]
    }"#;

    #[test]
    fn test_load_languages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("languages.json");
        fs::write(&path, LANGUAGES).unwrap();

        let manager = LanguageConfigManager::load(&path).unwrap();
        assert_eq!(manager.list_languages(), vec!["python", "shell"]);

        let python = manager.get_config("python").unwrap();
        assert_eq!(python.execution.command, "python3");
        assert_eq!(python.execution.args, vec!["-u"]);
        assert!(manager.get_config("shell").unwrap().execution.args.is_empty());
        assert!(manager.get_config("cobol").is_err());
    }

    #[test]
    fn test_languages_round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("languages.json");
        fs::write(&path, LANGUAGES).unwrap();
        let manager = LanguageConfigManager::load(&path).unwrap();

        fs::write(&path, manager.to_json().unwrap()).unwrap();
        let reloaded = LanguageConfigManager::load(&path).unwrap();
        assert_eq!(reloaded.list_languages(), manager.list_languages());
    }

    #[test]
    fn test_missing_language_file() {
        let err = LanguageConfigManager::load(Path::new("/nonexistent/languages.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_run_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{"resources": "exercise/resources"}"#).unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.resources, PathBuf::from("exercise/resources"));
        assert_eq!(config.workdir, PathBuf::from("."));
        assert_eq!(config.time_budget(), Duration::from_secs(10));
        assert_eq!(config.natural_language, "en");
        assert!(!config.options.parallel);
    }

    #[test]
    fn test_run_config_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{"workdir": "."}"#).unwrap();
        assert!(RunConfig::load(&path).is_err());
    }
}
