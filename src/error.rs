//! Error type shared by the engine builder, the simulator settings and the
//! policy-set factory.
//!
//! Every error here is raised while a policy is being **set up**.  Once an
//! adapter exists, recording events cannot fail: all operations are local,
//! synchronous and in-memory.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The engine was asked for a capacity of zero.
    #[error("max_capacity must be greater than 0")]
    InvalidCapacity,

    /// The shard count is not a non-zero power of two.
    #[error("num_shards must be a power of two, got {0}")]
    InvalidShardCount(usize),

    /// The eviction-policy selector does not name a supported policy.
    #[error("unsupported eviction policy {0:?} (expected one of: TinyLFU, LRU)")]
    UnsupportedEvictionPolicy(String),

    /// The simulator settings could not be parsed.
    #[error("invalid simulator settings: {0}")]
    Settings(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
