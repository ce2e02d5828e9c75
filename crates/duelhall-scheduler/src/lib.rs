//! Time-driven work for Duelhall.
//!
//! Two kinds of clock live here:
//!
//! - [`TickScheduler`] fires at a fixed rate. The lobby uses one at 1 Hz
//!   to poll every room's turn deadline.
//! - [`DeferredTimers`] runs an action once after a delay, keyed so it
//!   can be cancelled. Empty-room deletion and disconnect grace use it.
//!
//! Both sleep on the Tokio timer, so tests can pause and advance time.

mod tick;
mod timers;

pub use tick::{TickConfig, TickInfo, TickPolicy, TickScheduler};
pub use timers::DeferredTimers;
