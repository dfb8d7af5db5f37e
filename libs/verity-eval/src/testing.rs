// Shared fixtures for the evaluator tests
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use verity_common::config::RunConfig;

use crate::context::RunContext;
use crate::runner::{CustomInvocation, ProgramOutput, ProgramRunner};

/// Runner that answers every invocation with the same output.
#[derive(Debug)]
pub struct ScriptedRunner {
    output: ProgramOutput,
    calls: AtomicUsize,
    payloads: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(output: ProgramOutput) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<String> {
        self.payloads.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ProgramRunner for ScriptedRunner {
    async fn evaluate_custom(&self, invocation: CustomInvocation<'_>) -> ProgramOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(invocation.payload());
        self.output.clone()
    }
}

pub fn context_with_runner(runner: Arc<ScriptedRunner>) -> RunContext {
    RunContext::new(RunConfig::new("resources", "workdir"), runner)
}

pub fn context_in(resources: &Path, workdir: &Path) -> RunContext {
    let runner = Arc::new(ScriptedRunner::new(ProgramOutput::default()));
    RunContext::new(RunConfig::new(resources, workdir), runner)
}

pub fn context() -> RunContext {
    context_in(Path::new("resources"), Path::new("workdir"))
}
