//! Trace-replay harness plumbing.
//!
//! A harness builds one [`CachePolicy`] per eviction policy under test (or a
//! whole [`PolicySet`] from [`SimulatorSettings`]), feeds every
//! [`AccessEvent`] of a trace to each of them, calls `finished()`, and then
//! compares their [`PolicyStats`].

pub mod adapter;
pub mod engine;
pub mod event;
pub mod registry;
pub mod settings;
pub mod stats;

pub use adapter::{CachePolicy, Ownership};
pub use engine::{DefaultEngine, Engine, EngineConfig, SharedEngine, SharedEngines};
pub use event::{AccessEvent, Key, Weight};
pub use registry::PolicySet;
pub use settings::SimulatorSettings;
pub use stats::PolicyStats;

/// Prefix of every adapter's stats name.
pub const POLICY_NAME: &str = "product.Doppio";

/// Trace features a policy understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Event weights count against capacity.
    Weighted,
}

/// What a harness needs from any policy it replays a trace through.
pub trait TracePolicy: Send {
    fn name(&self) -> &str;

    fn characteristics(&self) -> &'static [Characteristic];

    fn record(&mut self, event: AccessEvent);

    /// Called once the trace is exhausted.  Statistics stay readable.
    fn finished(&mut self);

    fn stats(&self) -> &PolicyStats;
}
