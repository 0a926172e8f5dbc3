//! Reconciliation engine and poll loop for the incident relay.
//!
//! The engine decides, per incident snapshot, whether to skip, create,
//! patch, or recreate its mirrored message; the loop fetches the feed on a
//! fixed interval, executes those decisions against the channel, and reports
//! the confirmed deliveries back to the engine.

pub mod engine;
pub mod poll_loop;

#[cfg(test)]
mod test_support;

pub use engine::{Action, Delivery, ReconcileEngine};
pub use poll_loop::{PollCycleReport, PollLoop, PollLoopConfig};
