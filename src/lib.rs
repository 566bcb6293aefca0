/*!
# Overview
xferjob copies objects between local directories, or sets their properties in place, as a
set of resumable transfer jobs executed by a bounded pool of workers.

## Features
- Chunked transfer
  Objects larger than `--multipart-threshold` are split into `--multipart-chunksize` chunks.
  Each chunk is scheduled, retried and accounted for independently. A job is complete only
  when every chunk of it is complete.

- Bounded concurrency
  `--worker-size` workers pull chunks from a single queue bounded by `--queue-capacity`.
  Enumeration slows down when the queue is full, so memory stays flat for any tree size.

- Retry with backoff
  Transient failures(timeouts, throttling, unavailable storage) are retried with exponential
  backoff up to `--max-attempts`. Terminal failures(not found, permission denied) fail the job
  at once without retrying.

- Resume
  With `--resume-state-dir`, the status of every job is checkpointed. Running again with the same
  `--run-id` skips the objects completed by the previous run.

- Filtering
  Glob patterns on the name or relative path, a list of files, size, modified time and access tier.

- Properties
  Access tier, metadata and tags can be applied after a copy, or set in place with `--set-properties`.

## As a library
xferjob CLI is a thin wrapper of the xferjob library. The library takes the same arguments as the CLI.

Example usage
=============

```Toml
[dependencies]
xferjob = "0.3"
tokio = { version = "1", features = ["full"] }
```

```no_run
use xferjob::config::Config;
use xferjob::config::args::parse_from_args;
use xferjob::pipeline::Pipeline;
use xferjob::types::TransferStatistics;
use xferjob::types::job::RunOutcome;
use xferjob::types::token::create_pipeline_cancellation_token;

#[tokio::main]
async fn main() {
    // You can use all the arguments of the xferjob binary here.
    let args = vec!["program_name", "--recursive", "./src", "./dst"];

    // parse_from_args() returns an error if the arguments are invalid.
    let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

    // You can use this token to cancel the pipeline from another task.
    let cancellation_token = create_pipeline_cancellation_token();
    let mut pipeline = Pipeline::new(config, cancellation_token).await.unwrap();
    let stats_receiver = pipeline.get_stats_receiver();

    pipeline.run().await;

    let mut transferred_bytes = 0;
    while let Ok(stats) = stats_receiver.try_recv() {
        if let TransferStatistics::TransferBytes(bytes) = stats {
            transferred_bytes += bytes;
        }
    }
    println!("transferred {transferred_bytes} bytes");

    let run_summary = pipeline.get_run_summary();
    if run_summary.outcome != RunOutcome::AllSucceeded {
        for failure in &run_summary.failures {
            println!("{}: {}", failure.key, failure.message);
        }
    }

    if pipeline.has_error() {
        println!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
    }
}
```

For more examples, see the xferjob binary source code(`src/bin/xferjob`) and the integration tests(`tests`).
*/

pub use config::Config;
pub use config::args::CLIArgs;

pub mod config;
pub mod pipeline;
pub mod storage;
pub mod types;
