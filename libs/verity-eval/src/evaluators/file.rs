use tracing::{debug, instrument};
use verity_common::messages::MessageKey;
use verity_common::testplan::{resolve_path, Channel, Options};
use verity_common::types::{EvaluationResult, Message, Status};

use super::text::TextEvaluator;
use crate::context::RunContext;
use crate::error::{EvaluationError, Result};
use crate::options::{FileMode, FileOptions};

/// Compares a file written by the submission with an expected file.
#[derive(Debug, Clone)]
pub struct FileEvaluator {
    ctx: RunContext,
    options: FileOptions,
}

impl FileEvaluator {
    pub fn new(ctx: RunContext, options: &Options) -> Result<Self> {
        Ok(Self::with_options(ctx, FileOptions::from_options(options)?))
    }

    pub fn with_options(ctx: RunContext, options: FileOptions) -> Self {
        Self { ctx, options }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// The captured channel output plays no part here; both sides come from
    /// disk.
    #[instrument(level = "debug", skip_all)]
    pub async fn evaluate(&self, channel: Channel<'_>) -> Result<EvaluationResult> {
        let Channel::File(file) = channel else {
            return Err(EvaluationError::ChannelMismatch {
                evaluator: "file",
                channel: channel.kind_name(),
            });
        };

        let expected_path = resolve_path(&self.ctx.config.resources, &file.expected_path);
        let expected = tokio::fs::read_to_string(&expected_path)
            .await
            .map_err(|source| EvaluationError::ResourceUnavailable {
                path: expected_path.clone(),
                source,
            })?;

        let actual_path = resolve_path(&self.ctx.config.workdir, &file.actual_path);
        let actual = match tokio::fs::read_to_string(&actual_path).await {
            Ok(actual) => actual,
            Err(e) => {
                debug!(path = %actual_path.display(), error = %e, "Output file not readable");
                return Ok(EvaluationResult::new(Status::RuntimeError, expected, "")
                    .with_human(self.ctx.messages.get(MessageKey::OutputFileMissing))
                    .with_message(Message::staff(format!("{}: {e}", actual_path.display()))));
            }
        };

        match self.options.mode {
            FileMode::Exact => {
                let correct = expected == actual;
                Ok(EvaluationResult::verdict(correct, expected, actual))
            }
            FileMode::Lines => {
                let correct = expected.lines().count() == actual.lines().count()
                    && expected.lines().zip(actual.lines()).all(|(e, a)| e == a);
                Ok(EvaluationResult::verdict(correct, expected, actual))
            }
            FileMode::Values => self.compare_values(&expected, &actual),
        }
    }

    fn compare_values(&self, expected: &str, actual: &str) -> Result<EvaluationResult> {
        let expected_lines: Vec<&str> = expected.lines().collect();
        let actual_lines: Vec<&str> = actual.lines().collect();
        if expected_lines.len() != actual_lines.len() {
            return Ok(EvaluationResult::verdict(false, expected, actual));
        }

        let text = TextEvaluator::with_options(self.ctx.clone(), self.options.text.clone());
        let mut correct = true;
        let mut readable_expected = Vec::with_capacity(expected_lines.len());
        let mut readable_actual = Vec::with_capacity(actual_lines.len());
        for (expected_line, actual_line) in expected_lines.into_iter().zip(actual_lines) {
            let line = text.compare(expected_line, Some(actual_line))?;
            correct &= line.is_correct();
            readable_expected.push(line.readable_expected);
            readable_actual.push(line.readable_actual);
        }

        Ok(EvaluationResult::verdict(
            correct,
            readable_expected.join("\n"),
            readable_actual.join("\n"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TextOptions;
    use crate::testing::context_in;
    use std::path::Path;
    use verity_common::testplan::{EvaluatorDescriptor, FileOutputChannel};

    fn channel() -> FileOutputChannel {
        FileOutputChannel {
            expected_path: "expected.txt".to_string(),
            actual_path: "actual.txt".to_string(),
            evaluator: EvaluatorDescriptor::file(),
        }
    }

    async fn run(mode: FileMode, expected: &str, actual: Option<&str>) -> Result<EvaluationResult> {
        let resources = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();
        std::fs::write(resources.path().join("expected.txt"), expected).unwrap();
        if let Some(actual) = actual {
            std::fs::write(workdir.path().join("actual.txt"), actual).unwrap();
        }
        let options = FileOptions {
            mode,
            text: TextOptions {
                try_floating_point: true,
                ..TextOptions::default()
            },
        };
        let evaluator = FileEvaluator::with_options(context_in(resources.path(), workdir.path()), options);
        let channel = channel();
        evaluator.evaluate(Channel::File(&channel)).await
    }

    #[tokio::test]
    async fn test_exact_mode() {
        let result = run(FileMode::Exact, "a\nb\n", Some("a\nb\n")).await.unwrap();
        assert_eq!(result.status(), Status::Correct);

        let result = run(FileMode::Exact, "a\nb\n", Some("a\nb")).await.unwrap();
        assert_eq!(result.status(), Status::Wrong);
        assert_eq!(result.readable_actual, "a\nb");
    }

    #[tokio::test]
    async fn test_lines_mode_requires_same_line_count() {
        let result = run(FileMode::Lines, "a\nb\nc", Some("a\nb")).await.unwrap();
        assert_eq!(result.status(), Status::Wrong);

        let result = run(FileMode::Lines, "a\nb\n", Some("a\nb")).await.unwrap();
        assert_eq!(result.status(), Status::Correct);

        let result = run(FileMode::Lines, "a\nb", Some("a\nc")).await.unwrap();
        assert_eq!(result.status(), Status::Wrong);
    }

    #[tokio::test]
    async fn test_values_mode_compares_each_line() {
        let result = run(FileMode::Values, "1.0\n2.50\n", Some("1\n2.5\n")).await.unwrap();
        assert_eq!(result.status(), Status::Correct);
        assert_eq!(result.readable_expected, "1.0\n2.50");
        assert_eq!(result.readable_actual, "1\n2.5");

        let result = run(FileMode::Values, "1.0\n2.0", Some("1\n3")).await.unwrap();
        assert_eq!(result.status(), Status::Wrong);
    }

    #[tokio::test]
    async fn test_missing_actual_file_is_runtime_error() {
        let result = run(FileMode::Exact, "content", None).await.unwrap();
        assert_eq!(result.status(), Status::RuntimeError);
        assert_eq!(result.result.human.as_deref(), Some("Required output file not found."));
        assert_eq!(result.readable_expected, "content");
        assert_eq!(result.readable_actual, "");
    }

    #[tokio::test]
    async fn test_missing_expected_file_is_configuration_error() {
        let workdir = tempfile::tempdir().unwrap();
        let evaluator = FileEvaluator::new(context_in(Path::new("/nonexistent"), workdir.path()), &Options::new()).unwrap();
        let channel = channel();
        let err = evaluator.evaluate(Channel::File(&channel)).await.unwrap_err();
        assert!(matches!(err, EvaluationError::ResourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_rejects_text_channel() {
        let evaluator = FileEvaluator::new(crate::testing::context(), &Options::new()).unwrap();
        let text = verity_common::testplan::TextOutputChannel::text("x");
        let err = evaluator.evaluate(Channel::Text(&text)).await.unwrap_err();
        assert!(matches!(err, EvaluationError::ChannelMismatch { evaluator: "file", .. }));
    }
}
