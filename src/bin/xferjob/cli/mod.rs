use anyhow::{Result, anyhow};
use tokio::time::Instant;
use tracing::{error, info, trace, warn};

use xferjob::Config;
use xferjob::pipeline::Pipeline;
use xferjob::types::job::{RunOutcome, RunSummary};
use xferjob::types::token::create_pipeline_cancellation_token;
use xferjob::types::{FAILED_OBJECT_NAME, RUN_SUMMARY_NAME};

mod ctrl_c_handler;
mod indicator;
mod ui_config;

pub const EXIT_CODE_SUCCESS: i32 = 0;
pub const EXIT_CODE_ERROR: i32 = 1;
#[allow(dead_code)]
pub const EXIT_CODE_INVALID_ARGS: i32 = 2;
pub const EXIT_CODE_WARNING: i32 = 3;
pub const EXIT_CODE_PARTIAL_FAILURE: i32 = 4;
pub const EXIT_CODE_CANCELLED: i32 = 5;

/// Runs the pipeline and returns the process exit code.
///
/// A run error(enumeration, filter or dispatch) is returned as `Err`.
pub async fn run(config: Config) -> Result<i32> {
    let cancellation_token = create_pipeline_cancellation_token();

    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = Instant::now();
    trace!("transfer pipeline start.");

    let mut pipeline = Pipeline::new(config.clone(), cancellation_token).await?;
    let indicator_join_handle = indicator::show_indicator(
        pipeline.get_stats_receiver(),
        ui_config::is_progress_indicator_needed(&config),
        ui_config::is_show_result_needed(&config),
        config.dry_run,
    );

    pipeline.run().await;
    indicator_join_handle.await?;

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    let run_summary = pipeline.get_run_summary();
    show_run_summary(&run_summary);

    if pipeline.has_error() {
        error!(
            run_id = run_summary.run_id,
            duration_sec = duration_sec,
            "xferjob failed."
        );

        return Err(anyhow!("xferjob failed."));
    }

    trace!(duration_sec = duration_sec, "xferjob has been completed.");

    Ok(exit_code(run_summary.outcome, pipeline.has_warning()))
}

fn exit_code(outcome: RunOutcome, has_warning: bool) -> i32 {
    match outcome {
        RunOutcome::AllSucceeded if has_warning => EXIT_CODE_WARNING,
        RunOutcome::AllSucceeded => EXIT_CODE_SUCCESS,
        RunOutcome::PartialFailure => EXIT_CODE_PARTIAL_FAILURE,
        RunOutcome::TotalFailure => EXIT_CODE_ERROR,
        RunOutcome::Cancelled => EXIT_CODE_CANCELLED,
    }
}

fn show_run_summary(run_summary: &RunSummary) {
    let outcome = format!("{:?}", run_summary.outcome);

    for failure in &run_summary.failures {
        let kind = failure
            .kind
            .map(|kind| kind.to_string())
            .unwrap_or_default();

        error!(
            name = FAILED_OBJECT_NAME,
            key = failure.key,
            kind = kind,
            message = failure.message,
        );
    }

    let summary = &run_summary.summary;
    if run_summary.outcome == RunOutcome::AllSucceeded {
        info!(
            name = RUN_SUMMARY_NAME,
            run_id = run_summary.run_id,
            outcome = outcome,
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            transferred_bytes = summary.transferred_bytes,
        );
    } else {
        warn!(
            name = RUN_SUMMARY_NAME,
            run_id = run_summary.run_id,
            outcome = outcome,
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            transferred_bytes = summary.transferred_bytes,
        );
    }
}
