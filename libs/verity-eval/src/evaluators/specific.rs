use tracing::debug;
use verity_common::messages::MessageKey;
use verity_common::testplan::{Channel, EvaluatorDescriptor};
use verity_common::types::{EvaluationResult, Message, SpecificResult, Status};

use super::value::decode_diagnostic;
use crate::context::RunContext;
use crate::error::{EvaluationError, Result};

/// Reads the verdict a language-specific evaluation function already
/// produced while the submission ran.
#[derive(Debug, Clone)]
pub struct SpecificEvaluator {
    ctx: RunContext,
}

impl SpecificEvaluator {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn evaluate(&self, channel: Channel<'_>, actual: Option<&str>) -> Result<EvaluationResult> {
        if !matches!(channel.evaluator(), Some(EvaluatorDescriptor::Specific(_))) {
            return Err(EvaluationError::ChannelMismatch {
                evaluator: "specific",
                channel: channel.kind_name(),
            });
        }

        let Some(raw) = actual else {
            return Ok(EvaluationResult::new(Status::InternalError, "", "")
                .with_human(self.ctx.messages.get(MessageKey::ReceivedNoOutput)));
        };

        match SpecificResult::parse(raw) {
            Ok(record) => Ok(from_record(record, String::new(), String::new())),
            Err(e) => {
                debug!(error = %e, "Test result not recognized");
                Ok(EvaluationResult::new(Status::InternalError, "", raw)
                    .with_human(self.ctx.messages.get(MessageKey::ResultNotRecognized))
                    .with_message(Message::staff(decode_diagnostic(&self.ctx, raw, &e, "specific result"))))
            }
        }
    }
}

/// Turn a judge's verdict record into a result. Non-empty readable fields of
/// the record replace the given ones.
pub(crate) fn from_record(record: SpecificResult, readable_expected: String, readable_actual: String) -> EvaluationResult {
    let readable_expected = record
        .readable_expected
        .filter(|text| !text.is_empty())
        .unwrap_or(readable_expected);
    let readable_actual = record
        .readable_actual
        .filter(|text| !text.is_empty())
        .unwrap_or(readable_actual);
    EvaluationResult::verdict(record.result, readable_expected, readable_actual).with_messages(record.messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;
    use std::collections::BTreeMap;
    use verity_common::testplan::{EvaluationFunction, SpecificEvaluatorDescriptor, ValueOutputChannel};

    fn channel() -> ValueOutputChannel {
        let evaluators = BTreeMap::from([(
            "python".to_string(),
            EvaluationFunction {
                file: "evaluator.py".into(),
                name: "evaluate".to_string(),
            },
        )]);
        ValueOutputChannel {
            value: None,
            evaluator: EvaluatorDescriptor::Specific(SpecificEvaluatorDescriptor { evaluators }),
        }
    }

    fn evaluate(actual: Option<&str>) -> EvaluationResult {
        let channel = channel();
        SpecificEvaluator::new(context())
            .evaluate(Channel::Value(&channel), actual)
            .unwrap()
    }

    #[test]
    fn test_verdict_comes_from_record() {
        let result = evaluate(Some(
            r#"{"result": false, "readable_expected": "[1, 2]", "readable_actual": "[2, 1]", "messages": ["Order matters"]}"#,
        ));
        assert_eq!(result.status(), Status::Wrong);
        assert_eq!(result.readable_expected, "[1, 2]");
        assert_eq!(result.readable_actual, "[2, 1]");
        assert_eq!(result.messages, vec![Message::text("Order matters")]);

        let result = evaluate(Some(r#"{"result": true}"#));
        assert_eq!(result.status(), Status::Correct);
        assert_eq!(result.readable_expected, "");
        assert_eq!(result.readable_actual, "");
    }

    #[test]
    fn test_absent_output_is_internal_error() {
        assert_eq!(evaluate(None).status(), Status::InternalError);
    }

    #[test]
    fn test_undecodable_record_is_internal_error() {
        let result = evaluate(Some("True"));
        assert_eq!(result.status(), Status::InternalError);
        assert_eq!(
            result.result.human.as_deref(),
            Some("Something went wrong while receiving the test result. Contact staff.")
        );
        assert_eq!(result.messages.len(), 1);
    }

    #[test]
    fn test_requires_specific_descriptor() {
        let plain = ValueOutputChannel::new(verity_common::value::Value::integer(1));
        let err = SpecificEvaluator::new(context())
            .evaluate(Channel::Value(&plain), Some(r#"{"result": true}"#))
            .unwrap_err();
        assert!(matches!(err, EvaluationError::ChannelMismatch { evaluator: "specific", .. }));
    }
}
