//! Aggregation of raw check results into fixed-width chart buckets.

mod classify;
mod window;

pub use classify::*;
pub use window::*;
