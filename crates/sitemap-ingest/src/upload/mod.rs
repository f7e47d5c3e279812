//! Chunked upload: partitioning, windowed dispatch, retry and progress

pub mod progress;
pub mod scheduler;
pub mod worker;

pub use progress::{ProgressCallback, ProgressReporter};
pub use scheduler::{
    partition, Chunk, ChunkScheduler, FinalChunkPolicy, DEFAULT_CHUNK_SIZE,
    DEFAULT_CONCURRENCY_LIMIT,
};
pub use worker::{Delay, RetryPolicy, TokioDelay, UploadWorker};
