use tracing::{debug, instrument};
use verity_common::messages::MessageKey;
use verity_common::testplan::Channel;
use verity_common::types::{EvaluationResult, Message, Status};
use verity_common::value::Value;

use crate::context::RunContext;
use crate::error::{EvaluationError, Result};

/// Compares a returned value with the expected value of a value channel.
#[derive(Debug, Clone)]
pub struct ValueEvaluator {
    ctx: RunContext,
}

impl ValueEvaluator {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    #[instrument(level = "debug", skip_all)]
    pub fn evaluate(&self, channel: Channel<'_>, actual: Option<&str>) -> Result<EvaluationResult> {
        let expected = expected_value(channel, "value")?;
        let readable_expected = expected.readable();

        let actual = match decode_actual(&self.ctx, &readable_expected, actual) {
            Ok(actual) => actual,
            Err(result) => return Ok(result),
        };
        // No value at all never matches, not even an expected nothing
        let Some(actual) = actual else {
            return Ok(one_is_nothing(&self.ctx, readable_expected, String::new()));
        };
        let readable_actual = actual.readable();

        if nothing_mismatch(expected, Some(&actual)) {
            return Ok(one_is_nothing(&self.ctx, readable_expected, readable_actual));
        }

        let correct = expected.comparable() == actual.comparable();
        Ok(EvaluationResult::verdict(correct, readable_expected, readable_actual))
    }
}

/// The expected value of a value channel; a channel without one cannot be
/// evaluated.
pub(crate) fn expected_value<'a>(channel: Channel<'a>, evaluator: &'static str) -> Result<&'a Value> {
    let Channel::Value(value) = channel else {
        return Err(EvaluationError::ChannelMismatch {
            evaluator,
            channel: channel.kind_name(),
        });
    };
    value.value.as_ref().ok_or_else(|| {
        EvaluationError::Configuration(format!("the {evaluator} evaluator needs an expected value"))
    })
}

/// Decode the raw output of a value channel. Absent or empty output means no
/// value; undecodable output short-circuits into a WRONG result.
pub(crate) fn decode_actual(
    ctx: &RunContext,
    readable_expected: &str,
    actual: Option<&str>,
) -> std::result::Result<Option<Value>, EvaluationResult> {
    let raw = match actual {
        None => return Ok(None),
        Some(raw) if raw.is_empty() => return Ok(None),
        Some(raw) => raw,
    };
    Value::parse(raw).map(Some).map_err(|e| {
        debug!(error = %e, "Returned value not recognized");
        EvaluationResult::new(Status::Wrong, readable_expected, raw)
            .with_human(ctx.messages.get(MessageKey::ValueNotRecognized))
            .with_message(Message::staff(decode_diagnostic(ctx, raw, &e, "value")))
    })
}

pub(crate) fn decode_diagnostic(ctx: &RunContext, raw: &str, error: &dyn std::fmt::Display, stage: &str) -> String {
    let error = error.to_string();
    ctx.messages.format(
        MessageKey::DecodeDiagnostic,
        &[("actual", raw), ("error", error.as_str()), ("stage", stage)],
    )
}

/// Exactly one side is nothing; an absent actual counts as nothing.
pub(crate) fn nothing_mismatch(expected: &Value, actual: Option<&Value>) -> bool {
    expected.is_nothing() != actual.map_or(true, Value::is_nothing)
}

pub(crate) fn one_is_nothing(ctx: &RunContext, readable_expected: String, readable_actual: String) -> EvaluationResult {
    EvaluationResult::new(Status::Wrong, readable_expected, readable_actual)
        .with_human(ctx.messages.get(MessageKey::OneValueIsNothing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;
    use verity_common::testplan::ValueOutputChannel;
    use verity_common::types::Permission;

    fn evaluate(expected: Value, actual: Option<&str>) -> EvaluationResult {
        let channel = ValueOutputChannel::new(expected);
        ValueEvaluator::new(context()).evaluate(Channel::Value(&channel), actual).unwrap()
    }

    #[test]
    fn test_equal_values() {
        let result = evaluate(Value::integer(5), Some(r#"{"type": "int64", "data": 5}"#));
        assert_eq!(result.status(), Status::Correct);
        assert_eq!(result.readable_expected, "5");
        assert_eq!(result.readable_actual, "5");
    }

    #[test]
    fn test_different_values() {
        let result = evaluate(Value::text("a"), Some(r#"{"type": "text", "data": "b"}"#));
        assert_eq!(result.status(), Status::Wrong);
        assert_eq!(result.readable_expected, "'a'");
        assert_eq!(result.readable_actual, "'b'");
        assert!(result.result.human.is_none());
    }

    #[test]
    fn test_expected_nothing_actual_zero() {
        let result = evaluate(Value::nothing(), Some(r#"{"type": "integer", "data": 0}"#));
        assert_eq!(result.status(), Status::Wrong);
        assert_eq!(result.result.human.as_deref(), Some("One of the values is nothing."));
    }

    #[test]
    fn test_expected_value_actual_absent() {
        let result = evaluate(Value::integer(0), None);
        assert_eq!(result.status(), Status::Wrong);
        assert_eq!(result.result.human.as_deref(), Some("One of the values is nothing."));
        assert_eq!(result.readable_actual, "");
    }

    #[test]
    fn test_expected_nothing_actual_absent() {
        for actual in [None, Some("")] {
            let result = evaluate(Value::nothing(), actual);
            assert_eq!(result.status(), Status::Wrong);
            assert_eq!(result.readable_expected, "None");
            assert_eq!(result.readable_actual, "");
            assert_eq!(result.result.human.as_deref(), Some("One of the values is nothing."));
        }
    }

    #[test]
    fn test_expected_nothing_actual_nothing() {
        assert_eq!(
            evaluate(Value::nothing(), Some(r#"{"type": "null", "data": null}"#)).status(),
            Status::Correct
        );
    }

    #[test]
    fn test_undecodable_actual() {
        let result = evaluate(Value::integer(1), Some("{not json"));
        assert_eq!(result.status(), Status::Wrong);
        assert_eq!(result.readable_expected, "1");
        assert_eq!(result.readable_actual, "{not json");
        assert!(result.result.human.as_deref().unwrap().contains("Contact staff"));

        assert_eq!(result.messages.len(), 1);
        let diagnostic = &result.messages[0];
        assert_eq!(diagnostic.permission, Permission::Staff);
        assert!(diagnostic.description.starts_with("Received {not json, which caused"));
        assert!(diagnostic.description.ends_with("for value."));
    }

    #[test]
    fn test_missing_expected_value_is_configuration_error() {
        let channel = ValueOutputChannel {
            value: None,
            ..ValueOutputChannel::new(Value::nothing())
        };
        let err = ValueEvaluator::new(context())
            .evaluate(Channel::Value(&channel), Some("x"))
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Configuration(_)));
    }
}
