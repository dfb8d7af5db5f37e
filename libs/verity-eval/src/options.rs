// Typed options of the built-in evaluators, parsed once at construction
use serde::Deserialize;
use serde_json::Value as Json;
use verity_common::testplan::Options;

use crate::error::{EvaluationError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextOptions {
    pub ignore_whitespace: bool,
    pub case_insensitive: bool,
    pub try_floating_point: bool,
    pub apply_rounding: bool,
    pub round_to: i32,
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            ignore_whitespace: true,
            case_insensitive: false,
            try_floating_point: false,
            apply_rounding: false,
            round_to: 3,
            relative_tolerance: 1e-9,
            absolute_tolerance: 0.0,
        }
    }
}

impl TextOptions {
    /// Unknown keys are ignored, missing keys keep their default.
    pub fn from_options(options: &Options) -> Result<Self> {
        serde_json::from_value(Json::Object(options.clone()))
            .map_err(|e| EvaluationError::Configuration(format!("invalid text evaluator options: {e}")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileMode {
    #[default]
    Exact,
    Lines,
    Values,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileOptions {
    pub mode: FileMode,
    /// Used for the per-line comparison in `values` mode.
    pub text: TextOptions,
}

impl FileOptions {
    pub fn from_options(options: &Options) -> Result<Self> {
        let mode = match options.get("mode") {
            None => FileMode::Exact,
            Some(Json::String(mode)) => match mode.as_str() {
                "exact" => FileMode::Exact,
                "lines" => FileMode::Lines,
                "values" => FileMode::Values,
                other => {
                    return Err(EvaluationError::Configuration(format!(
                        "unknown mode for file evaluator: {other}"
                    )))
                }
            },
            Some(other) => {
                return Err(EvaluationError::Configuration(format!(
                    "file evaluator mode must be a string, got {other}"
                )))
            }
        };
        let mut text_options = options.clone();
        text_options.remove("mode");
        Ok(Self {
            mode,
            text: TextOptions::from_options(&text_options)?,
        })
    }
}
