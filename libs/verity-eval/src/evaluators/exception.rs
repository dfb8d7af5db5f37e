use tracing::debug;
use verity_common::messages::MessageKey;
use verity_common::testplan::Channel;
use verity_common::types::{EvaluationResult, Message, Status};
use verity_common::value::ExceptionValue;

use super::value::decode_diagnostic;
use crate::context::RunContext;
use crate::error::{EvaluationError, Result};

/// Compares the message of a raised exception with the expected one.
#[derive(Debug, Clone)]
pub struct ExceptionEvaluator {
    ctx: RunContext,
}

impl ExceptionEvaluator {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn evaluate(&self, channel: Channel<'_>, actual: Option<&str>) -> Result<EvaluationResult> {
        let Channel::Exception(channel) = channel else {
            return Err(EvaluationError::ChannelMismatch {
                evaluator: "exception",
                channel: channel.kind_name(),
            });
        };
        let expected = channel.exception.as_ref().ok_or_else(|| {
            EvaluationError::Configuration("the exception evaluator needs an expected exception".to_string())
        })?;

        let Some(raw) = actual else {
            return Ok(EvaluationResult::new(Status::InternalError, "", "")
                .with_human(self.ctx.messages.get(MessageKey::ReceivedNoOutput)));
        };

        match ExceptionValue::parse(raw) {
            Ok(actual) => {
                let correct = expected.message == actual.message;
                Ok(EvaluationResult::verdict(correct, expected.message.clone(), actual.message))
            }
            Err(e) => {
                debug!(error = %e, "Exception not recognized");
                Ok(EvaluationResult::new(Status::InternalError, expected.message.clone(), raw)
                    .with_human(self.ctx.messages.get(MessageKey::ExceptionNotRecognized))
                    .with_message(Message::staff(decode_diagnostic(&self.ctx, raw, &e, "exception"))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;
    use verity_common::testplan::ExceptionOutputChannel;
    use verity_common::types::Permission;

    fn evaluate(actual: Option<&str>) -> EvaluationResult {
        let channel = ExceptionOutputChannel::new(ExceptionValue::new("list index out of range"));
        ExceptionEvaluator::new(context())
            .evaluate(Channel::Exception(&channel), actual)
            .unwrap()
    }

    #[test]
    fn test_matching_message() {
        let result = evaluate(Some(r#"{"message": "list index out of range", "stacktrace": "..."}"#));
        assert_eq!(result.status(), Status::Correct);
        assert_eq!(result.readable_expected, "list index out of range");
        assert_eq!(result.readable_actual, "list index out of range");
    }

    #[test]
    fn test_different_message() {
        let result = evaluate(Some(r#"{"message": "key error"}"#));
        assert_eq!(result.status(), Status::Wrong);
        assert_eq!(result.readable_actual, "key error");
    }

    #[test]
    fn test_absent_output_is_internal_error() {
        let result = evaluate(None);
        assert_eq!(result.status(), Status::InternalError);
        assert_eq!(result.result.human.as_deref(), Some("Received no output."));
    }

    #[test]
    fn test_undecodable_output_is_internal_error() {
        let result = evaluate(Some("Traceback (most recent call last)"));
        assert_eq!(result.status(), Status::InternalError);
        assert_eq!(
            result.result.human.as_deref(),
            Some("Something went wrong while receiving the exception. Contact staff.")
        );
        assert_eq!(result.messages[0].permission, Permission::Staff);
        assert!(result.messages[0].description.ends_with("for exception."));
    }

    #[test]
    fn test_missing_expected_exception_is_configuration_error() {
        let channel = ExceptionOutputChannel {
            exception: None,
            ..ExceptionOutputChannel::new(ExceptionValue::new("x"))
        };
        let err = ExceptionEvaluator::new(context())
            .evaluate(Channel::Exception(&channel), Some("{}"))
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Configuration(_)));
    }
}
