mod builder;
mod cache;
mod error;
mod store;
mod metrics;
pub mod buffer;
pub mod policy;
pub mod simulator;
pub mod weigher;

pub use builder::{CacheBuilder, DEFAULT_HASH_SEED};
pub use cache::Cache;
pub use error::{Error, Result};
pub use metrics::stats::Metrics;
pub use policy::EvictionPolicy;
