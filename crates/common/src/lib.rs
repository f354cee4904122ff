//! Shared types used across the card registry crates.

pub mod clock;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use types::AggregateId;
