//! Buffers that decouple the hot read/write paths from the policy lock.

pub mod read;
pub mod write;
