use std::io;
use std::io::Write;

use async_channel::Receiver;
use indicatif::{HumanBytes, HumanCount, HumanDuration, ProgressBar, ProgressStyle};
use simple_moving_average::{SMA, SumTreeSMA};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use xferjob::types::TransferStatistics;

const MOVING_AVERAGE_PERIOD_SECS: usize = 10;
const REFRESH_INTERVAL: f32 = 1.0;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Totals {
    transferred_bytes: u64,
    completed: u64,
    failed: u64,
    cancelled: u64,
    skipped: u64,
    filtered: u64,
    retried: u64,
    warning: u64,
}

impl Totals {
    fn add(&mut self, stats: TransferStatistics) -> (u64, u64) {
        match stats {
            TransferStatistics::TransferBytes(size) => {
                self.transferred_bytes += size;
                return (size, 0);
            }
            TransferStatistics::JobComplete { .. } => {
                self.completed += 1;
                return (0, 1);
            }
            TransferStatistics::JobFailed { .. } => self.failed += 1,
            TransferStatistics::JobCancelled { .. } => self.cancelled += 1,
            TransferStatistics::JobSkip { .. } => self.skipped += 1,
            TransferStatistics::ObjectFiltered { .. } => self.filtered += 1,
            TransferStatistics::ChunkRetry { .. } => self.retried += 1,
            TransferStatistics::JobWarning { .. } => self.warning += 1,
        }

        (0, 0)
    }

    fn counts_message(&self) -> String {
        format!(
            "skipped {} objects,  filtered {} objects,  retried {} chunks,  failed {} objects,  cancelled {} objects,  warning {}",
            self.skipped, self.filtered, self.retried, self.failed, self.cancelled, self.warning,
        )
    }
}

pub fn show_indicator(
    stats_receiver: Receiver<TransferStatistics>,
    show_progress: bool,
    show_result: bool,
    dry_run: bool,
) -> JoinHandle<()> {
    let progress_style = ProgressStyle::with_template("{wide_msg}").unwrap();
    let progress_text = ProgressBar::new(0);
    progress_text.set_style(progress_style);

    tokio::spawn(async move {
        let start_time = Instant::now();

        let mut ma_transferred_bytes = SumTreeSMA::<_, u64, MOVING_AVERAGE_PERIOD_SECS>::new();
        let mut ma_completed_count = SumTreeSMA::<_, u64, MOVING_AVERAGE_PERIOD_SECS>::new();

        let mut totals = Totals::default();

        loop {
            let mut period_bytes: u64 = 0;
            let mut period_count: u64 = 0;

            let period = Instant::now();
            loop {
                while let Ok(stats) = stats_receiver.try_recv() {
                    let (bytes, count) = totals.add(stats);
                    period_bytes += bytes;
                    period_count += count;
                }

                if REFRESH_INTERVAL < period.elapsed().as_secs_f32() {
                    break;
                }

                if stats_receiver.is_closed() {
                    // drain what was sent right before closing
                    while let Ok(stats) = stats_receiver.try_recv() {
                        totals.add(stats);
                    }

                    let elapsed = start_time.elapsed();
                    let elapsed_secs_f64 = elapsed.as_secs_f64();

                    let mut objects_per_sec = (totals.completed as f64 / elapsed_secs_f64) as u64;
                    let mut bytes_per_sec =
                        (totals.transferred_bytes as f64 / elapsed_secs_f64) as u64;

                    if elapsed_secs_f64 < REFRESH_INTERVAL as f64 {
                        objects_per_sec = totals.completed;
                        bytes_per_sec = totals.transferred_bytes;
                    }
                    if dry_run {
                        objects_per_sec = 0;
                        bytes_per_sec = 0;
                    }

                    info!(
                        message = "transfer summary",
                        transferred_byte = totals.transferred_bytes,
                        transferred_byte_per_sec = bytes_per_sec,
                        completed_object = totals.completed,
                        completed_object_per_sec = objects_per_sec,
                        skipped = totals.skipped,
                        filtered = totals.filtered,
                        retried = totals.retried,
                        failed = totals.failed,
                        cancelled = totals.cancelled,
                        warning = totals.warning,
                        duration_sec = elapsed_secs_f64,
                    );

                    if show_result {
                        progress_text.set_style(ProgressStyle::with_template("{msg}").unwrap());

                        progress_text.finish_with_message(format!(
                            "{:>3} | {:>3}/sec,  completed {:>3} objects | {:>3} objects/sec,  {},  duration {}",
                            HumanBytes(totals.transferred_bytes),
                            HumanBytes(bytes_per_sec),
                            totals.completed,
                            HumanCount(objects_per_sec),
                            totals.counts_message(),
                            HumanDuration(elapsed),
                        ));

                        println!();
                        io::stdout().flush().unwrap()
                    }

                    return;
                }

                tokio::time::sleep(std::time::Duration::from_secs_f32(0.05)).await;
            }
            ma_transferred_bytes.add_sample(period_bytes);

            if !dry_run {
                ma_completed_count.add_sample(period_count);
            }

            if show_progress {
                progress_text.set_message(format!(
                    "{:>3} | {:>3}/sec,  completed {:>3} objects | {:>3} objects/sec,  {}",
                    HumanBytes(totals.transferred_bytes),
                    HumanBytes(ma_transferred_bytes.get_average()).to_string(),
                    totals.completed,
                    HumanCount(ma_completed_count.get_average()).to_string(),
                    totals.counts_message(),
                ));
            }
        }
    })
}
