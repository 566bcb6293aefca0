pub use crate::pipeline::scheduler::worker::ChunkWorker;

pub mod retry;
mod worker;
