//! Display state derived from a monitor's tick history.

mod classify;
mod elapsed;

pub use classify::*;
pub use elapsed::*;
