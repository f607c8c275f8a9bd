//! Cross-cutting helpers: tracing setup, statistics counters, time.

pub mod logging;
pub mod stats;
pub mod time;

pub use logging::init_tracing;
pub use stats::Stats;
pub use time::seconds_since_epoch;
