/// Testcase Verdicts and Job Scoring
///
/// **Core Responsibility:**
/// Turn per-channel evaluation results into one status per testcase, and
/// testcase statuses into a weighted job score.
///
/// **Status Rules:**
/// - A testcase gets the worst status among its channels
/// - A captured timeout or memory overrun overrides to the matching limit status
/// - Captured stdout or stderr longer than the output limit marks the testcase
///   as exceeding it
///
/// **Scoring Rules:**
/// - score = sum of weights of Correct testcases
/// - max_score = sum of all testcase weights
/// - overall_status: Completed if any testcase passed, Failed otherwise
use chrono::Utc;
use tracing::info;
use verity_common::types::{
    CapturedOutput, ChannelReport, JobStatus, JudgeJob, JudgeReport, Status, TestcaseReport,
};

pub fn testcase_status(channels: &[ChannelReport], captured: &CapturedOutput, output_limit: usize) -> Status {
    let mut status = channels
        .iter()
        .map(|channel| channel.evaluation.status())
        .fold(Status::Correct, Status::worst);

    if captured.timed_out {
        status = status.worst(Status::TimeLimitExceeded);
    }
    if captured.memory_exceeded {
        status = status.worst(Status::MemoryLimitExceeded);
    }
    let overflows = |output: &Option<String>| output.as_ref().is_some_and(|text| text.len() > output_limit);
    if overflows(&captured.stdout) || overflows(&captured.stderr) {
        status = status.worst(Status::OutputLimitExceeded);
    }
    status
}

/// Aggregate testcase reports into the final job report
pub fn aggregate_results(job: &JudgeJob, testcases: Vec<TestcaseReport>) -> JudgeReport {
    let max_score: u64 = testcases.iter().map(|testcase| u64::from(testcase.weight)).sum();
    let score: u64 = testcases
        .iter()
        .filter(|testcase| testcase.status == Status::Correct)
        .map(|testcase| u64::from(testcase.weight))
        .sum();
    let passed = testcases
        .iter()
        .filter(|testcase| testcase.status == Status::Correct)
        .count();

    let overall_status = if passed > 0 {
        JobStatus::Completed
    } else {
        JobStatus::Failed
    };

    info!(
        job_id = %job.id,
        passed,
        total = testcases.len(),
        score,
        max_score,
        status = ?overall_status,
        "Evaluation complete"
    );

    JudgeReport {
        job_id: job.id,
        overall_status,
        score,
        max_score,
        testcases,
        evaluated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use verity_common::types::{ChannelKind, EvaluationResult};

    const LIMIT: usize = 1024;

    /// Helper to create a channel report with the given status
    fn make_channel(channel: ChannelKind, status: Status) -> ChannelReport {
        ChannelReport {
            channel,
            evaluation: EvaluationResult::new(status, "", ""),
        }
    }

    /// Helper to create a testcase report
    fn make_report(testcase_id: u32, status: Status, weight: u32) -> TestcaseReport {
        TestcaseReport {
            testcase_id,
            status,
            weight,
            channels: vec![make_channel(ChannelKind::Stdout, status)],
            execution_time_ms: 10,
        }
    }

    fn make_job() -> JudgeJob {
        JudgeJob {
            id: Uuid::new_v4(),
            language: "python".to_string(),
            testcases: vec![],
        }
    }

    #[test]
    fn test_all_channels_correct() {
        let channels = vec![
            make_channel(ChannelKind::Stdout, Status::Correct),
            make_channel(ChannelKind::Result, Status::Correct),
        ];
        assert_eq!(testcase_status(&channels, &CapturedOutput::default(), LIMIT), Status::Correct);
    }

    #[test]
    fn test_worst_channel_wins() {
        let channels = vec![
            make_channel(ChannelKind::Stdout, Status::Wrong),
            make_channel(ChannelKind::Exception, Status::RuntimeError),
            make_channel(ChannelKind::Result, Status::Correct),
        ];
        assert_eq!(testcase_status(&channels, &CapturedOutput::default(), LIMIT), Status::RuntimeError);

        let channels = vec![
            make_channel(ChannelKind::Stdout, Status::InternalError),
            make_channel(ChannelKind::Stderr, Status::Wrong),
        ];
        assert_eq!(testcase_status(&channels, &CapturedOutput::default(), LIMIT), Status::InternalError);
    }

    #[test]
    fn test_timeout_overrides_wrong() {
        let channels = vec![make_channel(ChannelKind::Stdout, Status::Wrong)];
        let captured = CapturedOutput {
            timed_out: true,
            ..CapturedOutput::default()
        };
        assert_eq!(testcase_status(&channels, &captured, LIMIT), Status::TimeLimitExceeded);
    }

    #[test]
    fn test_memory_overrun_overrides_timeout() {
        let channels = vec![make_channel(ChannelKind::Stdout, Status::Correct)];
        let captured = CapturedOutput {
            timed_out: true,
            memory_exceeded: true,
            ..CapturedOutput::default()
        };
        assert_eq!(testcase_status(&channels, &captured, LIMIT), Status::MemoryLimitExceeded);
    }

    #[test]
    fn test_output_limit() {
        let channels = vec![make_channel(ChannelKind::Stdout, Status::Wrong)];
        let mut captured = CapturedOutput {
            stdout: Some("x".repeat(LIMIT)),
            ..CapturedOutput::default()
        };
        assert_eq!(testcase_status(&channels, &captured, LIMIT), Status::Wrong);

        captured.stderr = Some("e".repeat(LIMIT + 1));
        assert_eq!(testcase_status(&channels, &captured, LIMIT), Status::OutputLimitExceeded);

        captured.timed_out = true;
        assert_eq!(testcase_status(&channels, &captured, LIMIT), Status::TimeLimitExceeded);
    }

    #[test]
    fn test_large_weights_do_not_overflow() {
        let report = aggregate_results(
            &make_job(),
            vec![
                make_report(1, Status::Correct, u32::MAX),
                make_report(2, Status::Correct, u32::MAX),
                make_report(3, Status::Wrong, u32::MAX),
            ],
        );

        assert_eq!(report.score, 2 * u64::from(u32::MAX));
        assert_eq!(report.max_score, 3 * u64::from(u32::MAX));
    }

    #[test]
    fn test_all_pass() {
        let report = aggregate_results(
            &make_job(),
            vec![make_report(1, Status::Correct, 10), make_report(2, Status::Correct, 15)],
        );

        assert_eq!(report.overall_status, JobStatus::Completed);
        assert_eq!(report.score, 25);
        assert_eq!(report.max_score, 25);
    }

    #[test]
    fn test_partial_pass() {
        let report = aggregate_results(
            &make_job(),
            vec![make_report(1, Status::Correct, 20), make_report(2, Status::Wrong, 30)],
        );

        assert_eq!(report.overall_status, JobStatus::Completed);
        assert_eq!(report.score, 20);
        assert_eq!(report.max_score, 50);
    }

    #[test]
    fn test_all_fail() {
        let report = aggregate_results(
            &make_job(),
            vec![
                make_report(1, Status::Wrong, 10),
                make_report(2, Status::TimeLimitExceeded, 10),
            ],
        );

        assert_eq!(report.overall_status, JobStatus::Failed);
        assert_eq!(report.score, 0);
        assert_eq!(report.max_score, 20);
    }

    #[test]
    fn test_zero_weight_pass_still_completes() {
        let report = aggregate_results(&make_job(), vec![make_report(1, Status::Correct, 0)]);

        assert_eq!(report.overall_status, JobStatus::Completed);
        assert_eq!(report.score, 0);
    }

    #[test]
    fn test_empty_job() {
        let report = aggregate_results(&make_job(), vec![]);
        assert_eq!(report.overall_status, JobStatus::Failed);
        assert_eq!(report.max_score, 0);
        assert!(report.testcases.is_empty());
    }
}
