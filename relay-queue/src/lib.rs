//! # relay-queue
//!
//! Lock-free, fixed-capacity ring buffer queues for in-process data exchange
//! between threads, plus the idle-wait strategies a consumer uses while it
//! polls them.
//!
//! ## Features
//!
//! - **SPSC**: single-producer single-consumer queue. Lossless: a full queue
//!   hands the value back and the caller decides whether to retry or drop.
//! - **MPSC (drop)**: multi-producer single-consumer queue. Lossy: a full queue
//!   discards the value and counts it. Producers never block.
//! - **Wait strategies**: [`AdaptiveWait`] (spin → yield → sleep), plus the
//!   fixed [`SleepWait`] and [`SpinWait`] strategies it is measured against.
//! - **Run state**: [`AtomicRunState`], a single acquire/release state word
//!   for stop/pause signalling between the harness and consumer loops.
//!
//! ## Design Goals
//!
//! - No locks, no allocations after construction
//! - Capacity is a power of two; slots are addressed with a bitmask
//! - Cache-line isolation of `head`, `tail` and the drop counter
//! - Every cross-thread handoff is an explicit acquire/release pair
//!
//! ## Example
//!
//! ```
//! use relay_queue::{spsc, AdaptiveWait, WaitStrategy};
//! use std::thread;
//!
//! let (mut tx, mut rx) = spsc::channel::<u64>(1024).unwrap();
//!
//! let producer = thread::spawn(move || {
//!     for i in 0..100 {
//!         while tx.try_push(i).is_err() {
//!             std::hint::spin_loop();
//!         }
//!     }
//! });
//!
//! let mut wait = AdaptiveWait::new();
//! let mut received = Vec::new();
//! while received.len() < 100 {
//!     match rx.try_pop() {
//!         Some(v) => {
//!             received.push(v);
//!             wait.reset();
//!         }
//!         None => {
//!             wait.wait();
//!         }
//!     }
//! }
//!
//! producer.join().unwrap();
//! assert_eq!(received, (0..100).collect::<Vec<_>>());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod ring;
mod sync;

pub mod mpsc;
pub mod spsc;
pub mod state;
pub mod wait;

pub use error::{Error, Full, Result};
pub use state::{AtomicRunState, RunState};
pub use wait::{AdaptiveWait, Phase, SleepWait, SpinWait, WaitConfig, WaitStrategy};
