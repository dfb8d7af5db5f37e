//! Evaluation by an exercise-supplied program.
//!
//! Both sides of the channel are turned into [`Value`]s and handed to the
//! program through the [`ProgramRunner`](crate::runner::ProgramRunner). The
//! program answers with a verdict record on its standard output.

use std::time::Duration;
use tracing::{debug, instrument, warn};
use verity_common::messages::MessageKey;
use verity_common::testplan::{resolve_path, Channel, EvaluatorDescriptor};
use verity_common::types::{EvaluationResult, Message, SpecificResult, Status};
use verity_common::value::Value;

use super::specific::from_record;
use super::text::expected_text;
use super::value::{decode_actual, decode_diagnostic, expected_value, nothing_mismatch, one_is_nothing};
use crate::context::RunContext;
use crate::error::{EvaluationError, Result};
use crate::runner::CustomInvocation;

#[derive(Debug, Clone)]
pub struct CustomEvaluator {
    ctx: RunContext,
    arguments: Vec<Value>,
}

/// Both sides of a channel, ready to be sent to the program.
struct Prepared {
    expected: Value,
    readable_expected: String,
    actual: Option<Value>,
    readable_actual: String,
}

impl CustomEvaluator {
    pub fn new(ctx: RunContext, arguments: Vec<Value>) -> Self {
        Self { ctx, arguments }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    #[instrument(level = "debug", skip_all, fields(channel = channel.kind_name()))]
    pub async fn evaluate(
        &self,
        channel: Channel<'_>,
        actual: Option<&str>,
        budget: Duration,
    ) -> Result<EvaluationResult> {
        let Some(EvaluatorDescriptor::Custom(descriptor)) = channel.evaluator() else {
            return Err(self.mismatch(channel));
        };

        let prepared = match self.prepare(channel, actual)? {
            Ok(prepared) => prepared,
            Err(short_circuit) => return Ok(short_circuit),
        };

        let Some(actual) = prepared.actual.as_ref() else {
            return Ok(EvaluationResult::new(Status::Wrong, prepared.readable_expected, prepared.readable_actual)
                .with_message(Message::text(self.ctx.messages.get(MessageKey::ReceivedNothing))));
        };

        let output = self
            .ctx
            .runner
            .evaluate_custom(CustomInvocation {
                language: &descriptor.language,
                program: &descriptor.path,
                expected: &prepared.expected,
                actual,
                arguments: &self.arguments,
                budget,
            })
            .await;

        if output.stdout.trim().is_empty() {
            warn!(
                program = %descriptor.path.display(),
                timed_out = output.timed_out,
                "Custom evaluator produced no verdict"
            );
            let mut result = EvaluationResult::new(Status::Wrong, prepared.readable_expected, prepared.readable_actual)
                .with_human(self.ctx.messages.get(MessageKey::CustomEvaluatorFailed))
                .with_messages([Message::text(output.stdout), Message::text(output.stderr)]);
            if output.timed_out {
                let seconds = format!("{:.1}", budget.as_secs_f64());
                result = result.with_message(Message::staff(
                    self.ctx
                        .messages
                        .format(MessageKey::CustomEvaluatorTimedOut, &[("seconds", seconds.as_str())]),
                ));
            }
            if output.memory_exceeded {
                result = result.with_message(Message::staff(self.ctx.messages.get(MessageKey::CustomEvaluatorOutOfMemory)));
            }
            return Ok(result);
        }

        match SpecificResult::parse(&output.stdout) {
            Ok(record) => Ok(from_record(record, prepared.readable_expected, prepared.readable_actual)),
            Err(e) => {
                debug!(error = %e, "Custom evaluator verdict not recognized");
                Ok(
                    EvaluationResult::new(Status::InternalError, prepared.readable_expected, prepared.readable_actual)
                        .with_human(self.ctx.messages.get(MessageKey::ResultNotRecognized))
                        .with_message(Message::staff(decode_diagnostic(
                            &self.ctx,
                            &output.stdout,
                            &e,
                            "custom evaluator",
                        ))),
                )
            }
        }
    }

    /// The outer error is a setup problem; the inner one a finished result.
    fn prepare(
        &self,
        channel: Channel<'_>,
        actual: Option<&str>,
    ) -> Result<std::result::Result<Prepared, EvaluationResult>> {
        let config = &self.ctx.config;
        let prepared = match channel {
            Channel::Text(text) => {
                let expected = expected_text(text, &self.ctx)?;
                Prepared {
                    expected: Value::text(expected.clone()),
                    readable_expected: expected,
                    actual: actual.map(Value::text),
                    readable_actual: actual.unwrap_or_default().to_string(),
                }
            }
            Channel::File(file) => {
                let expected = resolve_path(&config.resources, &file.expected_path).display().to_string();
                let actual = resolve_path(&config.workdir, &file.actual_path).display().to_string();
                Prepared {
                    expected: Value::text(expected.clone()),
                    readable_expected: expected,
                    actual: Some(Value::text(actual.clone())),
                    readable_actual: actual,
                }
            }
            Channel::Value(_) => {
                let expected = expected_value(channel, "custom")?.clone();
                let readable_expected = expected.readable();
                let decoded = match decode_actual(&self.ctx, &readable_expected, actual) {
                    Ok(decoded) => decoded,
                    Err(result) => return Ok(Err(result)),
                };
                let readable_actual = decoded.as_ref().map(Value::readable).unwrap_or_default();
                if decoded.is_some() && nothing_mismatch(&expected, decoded.as_ref()) {
                    return Ok(Err(one_is_nothing(&self.ctx, readable_expected, readable_actual)));
                }
                Prepared {
                    expected,
                    readable_expected,
                    actual: decoded,
                    readable_actual,
                }
            }
            _ => return Err(self.mismatch(channel)),
        };
        Ok(Ok(prepared))
    }

    fn mismatch(&self, channel: Channel<'_>) -> EvaluationError {
        EvaluationError::ChannelMismatch {
            evaluator: "custom",
            channel: channel.kind_name(),
        }
    }
}
