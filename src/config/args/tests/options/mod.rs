mod dry_run;
mod filter;
mod properties;
mod resume;
mod retry;
mod tracing;
mod transfer;
