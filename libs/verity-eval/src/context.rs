use std::sync::Arc;

use verity_common::config::RunConfig;
use verity_common::messages::Messages;

use crate::runner::ProgramRunner;

/// Shared, read-only state every evaluator is built with.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Arc<RunConfig>,
    pub runner: Arc<dyn ProgramRunner>,
    pub messages: Arc<Messages>,
}

impl RunContext {
    pub fn new(config: RunConfig, runner: Arc<dyn ProgramRunner>) -> Self {
        let messages = Messages::for_language(&config.natural_language)
            .with_overrides(config.options.messages.clone());
        Self {
            config: Arc::new(config),
            runner,
            messages: Arc::new(messages),
        }
    }
}
