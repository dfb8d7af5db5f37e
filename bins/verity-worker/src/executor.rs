/// Job Executor - Channel Evaluation Orchestration
///
/// **Responsibility:**
/// Evaluate every declared channel of every testcase and hand the results
/// to the scoring layer.
///
/// **Architecture:**
/// 1. Resolve an evaluator per channel (`verity_eval::get_evaluator`)
/// 2. Evaluate the captured output against it
/// 3. Derive testcase statuses and the job score (scoring.rs)
///
/// Configuration errors never abort the job: the channel is reported as an
/// internal error with a staff-only explanation.
use futures_util::future::join_all;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use verity_common::display::abbreviate;
use verity_common::messages::MessageKey;
use verity_common::testplan::{Channel, ExitCodeOutputChannel};
use verity_common::types::{
    ChannelKind, ChannelReport, EvaluationResult, JudgeJob, JudgeReport, Message, Status, Testcase,
    TestcaseReport,
};
use verity_eval::{get_evaluator, RunContext};

use crate::scoring;

/// Evaluate a whole job
pub async fn execute_job(ctx: &RunContext, job: &JudgeJob) -> JudgeReport {
    info!(
        job_id = %job.id,
        language = %job.language,
        testcases = job.testcases.len(),
        parallel = ctx.config.options.parallel,
        "Starting job evaluation"
    );

    let deadline = Instant::now() + ctx.config.time_budget();
    let reports = if ctx.config.options.parallel {
        join_all(
            job.testcases
                .iter()
                .map(|testcase| evaluate_testcase(ctx, testcase, deadline)),
        )
        .await
    } else {
        let mut reports = Vec::with_capacity(job.testcases.len());
        for testcase in &job.testcases {
            reports.push(evaluate_testcase(ctx, testcase, deadline).await);
        }
        reports
    };

    // Cross-layer guard: log what the execution layer reported
    for testcase in &job.testcases {
        if testcase.captured.timed_out {
            warn!(testcase = testcase.id, "Submission timed out");
        }
        if testcase.captured.memory_exceeded {
            warn!(testcase = testcase.id, "Submission exceeded its memory limit");
        }
    }

    scoring::aggregate_results(job, reports)
}

#[instrument(skip_all, fields(testcase = testcase.id))]
pub async fn evaluate_testcase(ctx: &RunContext, testcase: &Testcase, deadline: Instant) -> TestcaseReport {
    let expected = &testcase.output;
    let captured = &testcase.captured;

    let declared = [
        (ChannelKind::Stdout, expected.stdout.as_channel(), captured.stdout.as_deref()),
        (ChannelKind::Stderr, expected.stderr.as_channel(), captured.stderr.as_deref()),
        (ChannelKind::File, expected.file.as_channel(), None),
        (
            ChannelKind::Exception,
            expected.exception.as_channel(),
            captured.exception.as_deref(),
        ),
        (ChannelKind::Result, expected.result.as_channel(), captured.result.as_deref()),
    ];

    let mut channels = Vec::with_capacity(declared.len() + 1);
    for (kind, channel, actual) in declared {
        let budget = deadline.saturating_duration_since(Instant::now());
        channels.push(evaluate_channel(ctx, kind, channel, actual, budget).await);
    }
    if let Some(exit_code) = &expected.exit_code {
        channels.push(ChannelReport {
            channel: ChannelKind::ExitCode,
            evaluation: evaluate_exit_code(exit_code, captured.exit_code),
        });
    }

    let status = scoring::testcase_status(&channels, captured, ctx.config.output_limit);
    debug!(status = %status, weight = testcase.weight, "Testcase evaluated");

    TestcaseReport {
        testcase_id: testcase.id,
        status,
        weight: testcase.weight,
        channels,
        execution_time_ms: captured.execution_time_ms,
    }
}

async fn evaluate_channel(
    ctx: &RunContext,
    kind: ChannelKind,
    channel: Channel<'_>,
    actual: Option<&str>,
    budget: Duration,
) -> ChannelReport {
    let outcome = match get_evaluator(ctx, channel) {
        Ok(evaluator) => evaluator.evaluate_within(channel, actual, budget).await,
        Err(e) => Err(e),
    };

    let evaluation = match outcome {
        Ok(evaluation) => evaluation,
        Err(e) => {
            error!(channel = %kind, error = %e, "Channel configuration error");
            let (channel, error) = (kind.to_string(), e.to_string());
            let explanation = ctx.messages.format(
                MessageKey::ChannelNotEvaluated,
                &[("channel", channel.as_str()), ("error", error.as_str())],
            );
            EvaluationResult::new(Status::InternalError, "", actual.unwrap_or_default())
                .with_message(Message::staff(explanation))
        }
    };

    if !evaluation.is_correct() {
        debug!(
            channel = %kind,
            status = %evaluation.status(),
            expected = %abbreviate(&evaluation.readable_expected),
            actual = %abbreviate(&evaluation.readable_actual),
            "Channel mismatch"
        );
    }

    ChannelReport {
        channel: kind,
        evaluation,
    }
}

fn evaluate_exit_code(expected: &ExitCodeOutputChannel, actual: Option<i32>) -> EvaluationResult {
    let readable_actual = actual.map(|code| code.to_string()).unwrap_or_default();
    let correct = actual == Some(expected.value);
    EvaluationResult::verdict(correct, expected.value.to_string(), readable_actual)
}
