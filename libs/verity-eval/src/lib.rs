//! Channel evaluation for the Verity judge.
//!
//! [`get_evaluator`] picks the [`Evaluator`] for an expected output channel;
//! [`Evaluator::evaluate`] judges what the submission produced on it.

pub mod context;
pub mod error;
pub mod evaluators;
pub mod options;
pub mod resolve;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use context::RunContext;
pub use error::EvaluationError;
pub use evaluators::Evaluator;
pub use resolve::get_evaluator;
pub use runner::{CustomInvocation, ProcessRunner, ProgramOutput, ProgramRunner};
