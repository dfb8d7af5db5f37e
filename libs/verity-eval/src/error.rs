use std::path::PathBuf;
use thiserror::Error;

/// Problems with the exercise setup. Anything the submission does wrong is
/// reported through an `EvaluationResult` instead.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0} evaluators are not supported")]
    Unsupported(&'static str),

    #[error("the {evaluator} evaluator cannot handle a {channel} channel")]
    ChannelMismatch {
        evaluator: &'static str,
        channel: &'static str,
    },

    #[error("resource {} is unavailable: {source}", .path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EvaluationError>;
