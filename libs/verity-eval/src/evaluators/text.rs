use tracing::instrument;
use verity_common::testplan::{Channel, Options, TextOutputChannel};
use verity_common::types::EvaluationResult;

use crate::context::RunContext;
use crate::error::{EvaluationError, Result};
use crate::options::TextOptions;

/// Compares program output with the expected text, optionally as numbers.
#[derive(Debug, Clone)]
pub struct TextEvaluator {
    ctx: RunContext,
    options: TextOptions,
}

impl TextEvaluator {
    pub fn new(ctx: RunContext, options: &Options) -> Result<Self> {
        Ok(Self::with_options(ctx, TextOptions::from_options(options)?))
    }

    pub fn with_options(ctx: RunContext, options: TextOptions) -> Self {
        Self { ctx, options }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn options(&self) -> &TextOptions {
        &self.options
    }

    #[instrument(level = "debug", skip_all)]
    pub fn evaluate(&self, channel: Channel<'_>, actual: Option<&str>) -> Result<EvaluationResult> {
        let Channel::Text(text) = channel else {
            return Err(EvaluationError::ChannelMismatch {
                evaluator: "text",
                channel: channel.kind_name(),
            });
        };
        let expected = expected_text(text, &self.ctx)?;
        self.compare(&expected, actual)
    }

    /// Compare one expected string with one actual string.
    pub fn compare(&self, expected: &str, actual: Option<&str>) -> Result<EvaluationResult> {
        let expected = self.normalize(expected);
        let Some(actual) = actual else {
            return Ok(EvaluationResult::verdict(false, expected, ""));
        };
        let actual = self.normalize(actual);

        let correct = match parse_float(&actual) {
            Some(actual_number) if self.options.try_floating_point => {
                let expected_number = parse_float(&expected).ok_or_else(|| {
                    EvaluationError::Configuration(format!(
                        "expected output '{expected}' is not a floating point number"
                    ))
                })?;
                self.numbers_match(expected_number, actual_number)
            }
            _ => actual == expected,
        };

        Ok(EvaluationResult::verdict(correct, expected, actual))
    }

    fn normalize(&self, text: &str) -> String {
        let text = if self.options.ignore_whitespace { text.trim() } else { text };
        if self.options.case_insensitive {
            text.to_lowercase()
        } else {
            text.to_string()
        }
    }

    fn numbers_match(&self, expected: f64, actual: f64) -> bool {
        let (expected, actual) = if self.options.apply_rounding {
            (
                round_half_even(expected, self.options.round_to),
                round_half_even(actual, self.options.round_to),
            )
        } else {
            (expected, actual)
        };
        is_close(
            expected,
            actual,
            self.options.relative_tolerance,
            self.options.absolute_tolerance,
        )
    }
}

/// Expected text of a text channel, read from the resources when needed.
pub(crate) fn expected_text(channel: &TextOutputChannel, ctx: &RunContext) -> Result<String> {
    channel
        .data_as_string(&ctx.config.resources)
        .map_err(|source| EvaluationError::ResourceUnavailable {
            path: ctx.config.resources.join(&channel.data),
            source,
        })
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

fn round_half_even(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(digits);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round_ties_even() / factor
}

fn is_close(a: f64, b: f64, relative: f64, absolute: f64) -> bool {
    if a == b {
        return true;
    }
    if a.is_infinite() || b.is_infinite() {
        return false;
    }
    let difference = (a - b).abs();
    difference <= (relative * a.abs().max(b.abs())).max(absolute)
}
