//! Unbounded multi-producer multi-consumer FIFO queue built from two locks
//!
//! - `queue`: `ConcurrentQueue`, a linked list with separate head and tail
//!   locks and blocking pops driven by a condition variable
//! - `config`: serde/TOML queue configuration
//! - `stats`: counters snapshot, optionally mirrored to `metrics`
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use twinlock_queue::ConcurrentQueue;
//!
//! let queue = Arc::new(ConcurrentQueue::new());
//! let consumer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || queue.wait_and_pop())
//! };
//! queue.push("job");
//! assert_eq!(consumer.join().unwrap(), "job");
//! assert!(queue.is_empty());
//! ```

pub mod config;
pub mod error;
mod node;
pub mod queue;
pub mod stats;
mod sync;

pub use config::QueueConfig;
pub use error::{PushError, QueueError, Result};
pub use queue::ConcurrentQueue;
pub use stats::QueueStats;
