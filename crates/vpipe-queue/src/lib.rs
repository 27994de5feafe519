//! Redis Streams transcode task queue.
//!
//! This crate provides:
//! - Task publishing via Redis Streams
//! - Consumer-group delivery with manual acknowledgement
//! - Retry counting, stale claim and dead-letter handling

pub mod broker;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod queue;

pub use broker::{Delivery, TaskBroker};
pub use error::{QueueError, QueueResult};
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryBroker;
pub use queue::{QueueConfig, TaskQueue};
