/// Evaluator Resolution
///
/// Maps a channel and its evaluator descriptor onto the evaluator that
/// judges it. Sentinel channels are settled before any descriptor is looked
/// at. Descriptors that cannot work on the channel they are attached to are
/// reported as configuration errors here, before anything is evaluated.
use tracing::debug;
use verity_common::testplan::{Channel, EvaluatorDescriptor, TextBuiltin};

use crate::context::RunContext;
use crate::error::{EvaluationError, Result};
use crate::evaluators::{
    CustomEvaluator, Evaluator, ExceptionEvaluator, FileEvaluator, IgnoredEvaluator, NoneEvaluator,
    SpecificEvaluator, TextEvaluator, ValueEvaluator,
};

pub fn get_evaluator(ctx: &RunContext, channel: Channel<'_>) -> Result<Evaluator> {
    let descriptor = match channel {
        Channel::None => return Ok(Evaluator::None(NoneEvaluator::new(ctx.clone()))),
        Channel::Ignored => return Ok(Evaluator::Ignored(IgnoredEvaluator::new(ctx.clone()))),
        Channel::Text(text) => &text.evaluator,
        Channel::File(file) => &file.evaluator,
        Channel::Value(value) => &value.evaluator,
        Channel::Exception(exception) => &exception.evaluator,
    };

    let evaluator = match descriptor {
        EvaluatorDescriptor::TextBuiltin {
            name: TextBuiltin::Text,
            options,
        } => {
            require(channel, "text", matches!(channel, Channel::Text(_)))?;
            Evaluator::Text(TextEvaluator::new(ctx.clone(), options)?)
        }
        EvaluatorDescriptor::TextBuiltin {
            name: TextBuiltin::File,
            options,
        } => {
            require(channel, "file", matches!(channel, Channel::File(_)))?;
            Evaluator::File(FileEvaluator::new(ctx.clone(), options)?)
        }
        EvaluatorDescriptor::TextBuiltin {
            name: TextBuiltin::Exception,
            ..
        } => {
            require(channel, "exception", matches!(channel, Channel::Exception(_)))?;
            Evaluator::Exception(ExceptionEvaluator::new(ctx.clone()))
        }
        EvaluatorDescriptor::ValueBuiltin { .. } => {
            require(channel, "value", matches!(channel, Channel::Value(_)))?;
            if let Channel::Value(value) = channel {
                if value.value.is_none() {
                    return Err(EvaluationError::Configuration(
                        "the value evaluator needs an expected value".to_string(),
                    ));
                }
            }
            Evaluator::Value(ValueEvaluator::new(ctx.clone()))
        }
        EvaluatorDescriptor::ExceptionBuiltin { .. } => {
            return Err(EvaluationError::Unsupported("built-in exception"));
        }
        EvaluatorDescriptor::Custom(custom) => {
            require(
                channel,
                "custom",
                matches!(channel, Channel::Text(_) | Channel::File(_) | Channel::Value(_)),
            )?;
            Evaluator::Custom(CustomEvaluator::new(ctx.clone(), custom.arguments.clone()))
        }
        EvaluatorDescriptor::Specific(specific) => {
            require(
                channel,
                "specific",
                matches!(channel, Channel::Value(_) | Channel::Exception(_)),
            )?;
            let language = &ctx.config.programming_language;
            if !language.is_empty() && !specific.evaluators.contains_key(language) {
                return Err(EvaluationError::Configuration(format!(
                    "the specific evaluator has no evaluation function for {language}"
                )));
            }
            Evaluator::Specific(SpecificEvaluator::new(ctx.clone()))
        }
    };

    debug!(
        channel = channel.kind_name(),
        evaluator = evaluator.name(),
        "Resolved evaluator"
    );
    Ok(evaluator)
}

fn require(channel: Channel<'_>, evaluator: &'static str, supported: bool) -> Result<()> {
    if supported {
        Ok(())
    } else {
        Err(EvaluationError::Configuration(format!(
            "the {evaluator} evaluator cannot be used on a {} channel",
            channel.kind_name()
        )))
    }
}
