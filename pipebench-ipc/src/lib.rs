#![warn(missing_docs)]
//! Pipebench IPC - Settings Transport
//!
//! The harness hands runtime configuration to the external filter stage
//! through a bounded POSIX message queue:
//! - `FilterSettings` is the fixed 8-byte record each filter unit receives
//! - `SettingsQueue` creates and publishes to the bounded queue
//! - `unlink_queue` removes the well-known queue objects between runs
//!
//! Message boundaries come from the queue itself, so there is no framing
//! layer; the record layout is shared with the external stages and must not
//! change shape.

mod messages;
mod queue;

pub use messages::{FilterSettings, WireError, QUEUE_DEPTH_BUDGET, SETTINGS_MSG_SIZE};
pub use queue::{unlink_queue, QueueError, SettingsQueue, SETTINGS_QUEUE_CAPACITY};
