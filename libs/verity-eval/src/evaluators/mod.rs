mod custom;
mod exception;
mod file;
mod sentinel;
mod specific;
mod text;
mod value;

pub use custom::CustomEvaluator;
pub use exception::ExceptionEvaluator;
pub use file::FileEvaluator;
pub use sentinel::{IgnoredEvaluator, NoneEvaluator};
pub use specific::SpecificEvaluator;
pub use text::TextEvaluator;
pub use value::ValueEvaluator;

use std::time::Duration;
use tracing::debug;
use verity_common::testplan::Channel;
use verity_common::types::EvaluationResult;

use crate::context::RunContext;
use crate::error::Result;

/// Every way a channel can be judged.
#[derive(Debug, Clone)]
pub enum Evaluator {
    Text(TextEvaluator),
    File(FileEvaluator),
    Value(ValueEvaluator),
    None(NoneEvaluator),
    Ignored(IgnoredEvaluator),
    Exception(ExceptionEvaluator),
    Specific(SpecificEvaluator),
    Custom(CustomEvaluator),
}

impl Evaluator {
    pub fn name(&self) -> &'static str {
        match self {
            Evaluator::Text(_) => "text",
            Evaluator::File(_) => "file",
            Evaluator::Value(_) => "value",
            Evaluator::None(_) => "none",
            Evaluator::Ignored(_) => "ignored",
            Evaluator::Exception(_) => "exception",
            Evaluator::Specific(_) => "specific",
            Evaluator::Custom(_) => "custom",
        }
    }

    fn context(&self) -> &RunContext {
        match self {
            Evaluator::Text(evaluator) => evaluator.context(),
            Evaluator::File(evaluator) => evaluator.context(),
            Evaluator::Value(evaluator) => evaluator.context(),
            Evaluator::None(evaluator) => evaluator.context(),
            Evaluator::Ignored(evaluator) => evaluator.context(),
            Evaluator::Exception(evaluator) => evaluator.context(),
            Evaluator::Specific(evaluator) => evaluator.context(),
            Evaluator::Custom(evaluator) => evaluator.context(),
        }
    }

    /// Judge `actual` against `channel`. `actual` is `None` when the
    /// submission produced nothing on the channel.
    ///
    /// An `Err` always means the exercise is set up wrong; whatever the
    /// submission printed ends up in the returned result.
    pub async fn evaluate(&self, channel: Channel<'_>, actual: Option<&str>) -> Result<EvaluationResult> {
        let budget = self.context().config.time_budget();
        self.evaluate_within(channel, actual, budget).await
    }

    /// Like [`Evaluator::evaluate`], with the time left for running a custom
    /// evaluator program.
    pub async fn evaluate_within(
        &self,
        channel: Channel<'_>,
        actual: Option<&str>,
        budget: Duration,
    ) -> Result<EvaluationResult> {
        let result = match self {
            Evaluator::Text(evaluator) => evaluator.evaluate(channel, actual),
            Evaluator::File(evaluator) => evaluator.evaluate(channel).await,
            Evaluator::Value(evaluator) => evaluator.evaluate(channel, actual),
            Evaluator::None(evaluator) => evaluator.evaluate(channel, actual),
            Evaluator::Ignored(evaluator) => evaluator.evaluate(channel, actual),
            Evaluator::Exception(evaluator) => evaluator.evaluate(channel, actual),
            Evaluator::Specific(evaluator) => evaluator.evaluate(channel, actual),
            Evaluator::Custom(evaluator) => evaluator.evaluate(channel, actual, budget).await,
        }?;

        debug!(
            evaluator = self.name(),
            status = %result.status(),
            "Channel evaluated"
        );
        Ok(result)
    }
}
