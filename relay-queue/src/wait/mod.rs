//! Idle-wait strategies for a consumer polling an empty queue.
//!
//! A consumer loop calls [`WaitStrategy::wait`] after every failed pop and
//! [`WaitStrategy::reset`] after every successful one:
//!
//! ```
//! use relay_queue::{spsc, AdaptiveWait, AtomicRunState, RunState, WaitStrategy};
//!
//! let (mut tx, mut rx) = spsc::channel::<u32>(64).unwrap();
//! let state = AtomicRunState::new(RunState::Running);
//!
//! tx.try_push(7).unwrap();
//! state.store(RunState::Stopping);
//!
//! let mut wait = AdaptiveWait::new();
//! let mut consumed = 0;
//! while state.load() == RunState::Running || !rx.is_empty() {
//!     if rx.try_pop().is_some() {
//!         consumed += 1;
//!         wait.reset();
//!     } else {
//!         wait.wait();
//!     }
//! }
//! assert_eq!(consumed, 1);
//! ```
//!
//! # Three-Phase Backoff
//!
//! ```text
//! Phase 1: Spin   (idle_count < spin_threshold)
//! ├── Burst of pause/yield hint instructions
//! └── Lowest latency, burns a core
//!
//! Phase 2: Yield  (idle_count < yield_threshold)
//! ├── Give the rest of the time slice back to the scheduler
//! └── Moderate latency, far less CPU
//!
//! Phase 3: Sleep  (otherwise)
//! ├── Block for a fixed quantum (default 1 ms)
//! └── Lowest CPU, highest tail latency
//! ```
//!
//! A fixed sleep under-reacts to short bursts: a 50 µs gap between bursts
//! costs a full 1 ms of latency and the queue fills up meanwhile. The
//! adaptive strategy catches short gaps while spinning and only pays for
//! sleeping once the queue has been idle for a while.

pub mod config;
pub mod hint;

use std::thread;
use std::time::Duration;

pub use config::{WaitConfig, WaitConfigBuilder};
pub use hint::hardware_idle_hint;

use crate::error::Result;

/// What a single [`WaitStrategy::wait`] call did.
///
/// Ordered by cost: `Spin < Yield < Sleep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Busy-waited with hardware idle hints.
    Spin,
    /// Yielded the time slice to the OS scheduler.
    Yield,
    /// Slept for the configured quantum.
    Sleep,
}

/// Policy for what a consumer does while the queue is empty.
pub trait WaitStrategy {
    /// Waits once after an unsuccessful poll. Returns the phase executed.
    fn wait(&mut self) -> Phase;

    /// Forgets idle history. Call after every successful poll.
    fn reset(&mut self);
}

/// Spin, then yield, then sleep, as a function of consecutive idle waits.
///
/// One instance per consumer thread; the idle count is not shared.
#[derive(Debug, Clone)]
pub struct AdaptiveWait {
    idle_count: u64,
    config: WaitConfig,
}

impl AdaptiveWait {
    /// Creates a strategy with the default thresholds (64 / 256, 1 ms sleep).
    pub fn new() -> Self {
        Self {
            idle_count: 0,
            config: WaitConfig::default(),
        }
    }

    /// Creates a strategy with custom thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// configuration doesn't validate.
    ///
    /// # Example
    ///
    /// ```
    /// use relay_queue::{AdaptiveWait, WaitConfig};
    /// use std::time::Duration;
    ///
    /// let config = WaitConfig::builder()
    ///     .spin_threshold(16)
    ///     .yield_threshold(64)
    ///     .sleep(Duration::from_micros(100))
    ///     .build()
    ///     .unwrap();
    /// let wait = AdaptiveWait::with_config(config).unwrap();
    /// assert_eq!(wait.idle_count(), 0);
    /// ```
    pub fn with_config(config: WaitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            idle_count: 0,
            config,
        })
    }

    /// Consecutive idle waits since the last reset.
    #[inline]
    pub const fn idle_count(&self) -> u64 {
        self.idle_count
    }

    /// The phase the next [`wait`](WaitStrategy::wait) will execute.
    #[inline]
    pub const fn next_phase(&self) -> Phase {
        self.config.phase_for(self.idle_count.saturating_add(1))
    }

    /// Returns the configuration.
    #[inline]
    pub const fn config(&self) -> &WaitConfig {
        &self.config
    }
}

impl Default for AdaptiveWait {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for AdaptiveWait {
    #[inline]
    fn wait(&mut self) -> Phase {
        let previous = self.config.phase_for(self.idle_count);
        self.idle_count = self.idle_count.saturating_add(1);

        let phase = self.config.phase_for(self.idle_count);
        match phase {
            Phase::Spin => hint::spin_burst(self.config.spin_hints),
            Phase::Yield => thread::yield_now(),
            Phase::Sleep => {
                if previous != Phase::Sleep {
                    tracing::trace!(
                        idle_count = self.idle_count,
                        sleep = ?self.config.sleep,
                        "consumer idle, escalating to sleep"
                    );
                }
                thread::sleep(self.config.sleep);
            }
        }
        phase
    }

    #[inline]
    fn reset(&mut self) {
        self.idle_count = 0;
    }
}

/// Always sleeps for a fixed quantum. The naive baseline.
#[derive(Debug, Clone, Copy)]
pub struct SleepWait {
    quantum: Duration,
}

impl SleepWait {
    /// Creates a strategy that sleeps for `quantum` on every wait.
    pub const fn new(quantum: Duration) -> Self {
        Self { quantum }
    }
}

impl Default for SleepWait {
    fn default() -> Self {
        Self::new(config::DEFAULT_SLEEP)
    }
}

impl WaitStrategy for SleepWait {
    fn wait(&mut self) -> Phase {
        thread::sleep(self.quantum);
        Phase::Sleep
    }

    fn reset(&mut self) {}
}

/// Always spins. Only sensible when producer and consumer have their own cores.
///
/// Pinned to the same core as its producer, a spinning consumer burns the
/// producer's time slice and throughput collapses.
#[derive(Debug, Clone, Copy)]
pub struct SpinWait {
    hints: u32,
}

impl SpinWait {
    /// Creates a strategy issuing `hints` idle hints per wait.
    pub const fn new(hints: u32) -> Self {
        Self { hints }
    }
}

impl Default for SpinWait {
    fn default() -> Self {
        Self::new(config::DEFAULT_SPIN_HINTS)
    }
}

impl WaitStrategy for SpinWait {
    #[inline]
    fn wait(&mut self) -> Phase {
        hint::spin_burst(self.hints);
        Phase::Spin
    }

    fn reset(&mut self) {}
}
