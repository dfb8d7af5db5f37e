// Evaluators for channels declared as "none" or "ignored"
use verity_common::testplan::Channel;
use verity_common::types::{EvaluationResult, Status};
use verity_common::value::{ExceptionValue, Value};

use crate::context::RunContext;
use crate::error::{EvaluationError, Result};

/// Tries to turn raw output into a readable form.
type DecodeAttempt = fn(&str) -> Option<String>;

fn as_exception(raw: &str) -> Option<String> {
    ExceptionValue::parse(raw).ok().map(|exception| exception.with_stacktrace())
}

fn as_value(raw: &str) -> Option<String> {
    Value::parse(raw).ok().map(|value| value.readable())
}

const NONE_ATTEMPTS: &[DecodeAttempt] = &[as_exception];
const IGNORED_ATTEMPTS: &[DecodeAttempt] = &[as_exception, as_value];

/// First successful attempt wins; the raw text is the fallback.
fn readable(raw: &str, attempts: &[DecodeAttempt]) -> String {
    attempts
        .iter()
        .find_map(|attempt| attempt(raw))
        .unwrap_or_else(|| raw.to_string())
}

/// Expects the channel to stay silent.
#[derive(Debug, Clone)]
pub struct NoneEvaluator {
    ctx: RunContext,
}

impl NoneEvaluator {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn evaluate(&self, channel: Channel<'_>, actual: Option<&str>) -> Result<EvaluationResult> {
        if !matches!(channel, Channel::None) {
            return Err(EvaluationError::ChannelMismatch {
                evaluator: "none",
                channel: channel.kind_name(),
            });
        }
        match actual.filter(|raw| !raw.is_empty()) {
            None => Ok(EvaluationResult::new(Status::Correct, "", "")),
            Some(raw) => Ok(EvaluationResult::new(Status::Wrong, "", readable(raw, NONE_ATTEMPTS))),
        }
    }
}

/// Accepts anything; the output is only rendered for feedback.
#[derive(Debug, Clone)]
pub struct IgnoredEvaluator {
    ctx: RunContext,
}

impl IgnoredEvaluator {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn evaluate(&self, channel: Channel<'_>, actual: Option<&str>) -> Result<EvaluationResult> {
        if !matches!(channel, Channel::Ignored) {
            return Err(EvaluationError::ChannelMismatch {
                evaluator: "ignored",
                channel: channel.kind_name(),
            });
        }
        let readable_actual = actual
            .map(|raw| readable(raw, IGNORED_ATTEMPTS))
            .unwrap_or_default();
        Ok(EvaluationResult::new(Status::Correct, "", readable_actual))
    }
}
