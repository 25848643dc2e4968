//! Tuning for [`AdaptiveWait`](super::AdaptiveWait).

use std::time::Duration;

use super::Phase;
use crate::error::{Error, Result};

/// Default number of consecutive idle waits spent spinning.
pub const DEFAULT_SPIN_THRESHOLD: u64 = 64;

/// Default number of consecutive idle waits before sleeping.
pub const DEFAULT_YIELD_THRESHOLD: u64 = 256;

/// Default idle hints issued per spinning wait.
pub const DEFAULT_SPIN_HINTS: u32 = 32;

/// Default sleep quantum.
pub const DEFAULT_SLEEP: Duration = Duration::from_millis(1);

/// Thresholds and quanta for the three wait phases.
///
/// With `n` consecutive idle waits (counted from 1):
///
/// | Phase | Condition                                  |
/// |-------|--------------------------------------------|
/// | Spin  | `n < spin_threshold`                       |
/// | Yield | `spin_threshold <= n < yield_threshold`    |
/// | Sleep | `n >= yield_threshold`                     |
///
/// The sleep quantum trades tail latency for CPU usage. If it exceeds the gap
/// between bursts of arrivals, items pile up in the queue while the consumer
/// sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Idle waits below this count spin.
    pub spin_threshold: u64,
    /// Idle waits at or above this count sleep.
    pub yield_threshold: u64,
    /// Hint instructions per spinning wait.
    pub spin_hints: u32,
    /// How long a sleeping wait blocks.
    pub sleep: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            spin_threshold: DEFAULT_SPIN_THRESHOLD,
            yield_threshold: DEFAULT_YIELD_THRESHOLD,
            spin_hints: DEFAULT_SPIN_HINTS,
            sleep: DEFAULT_SLEEP,
        }
    }
}

impl WaitConfig {
    /// Starts a builder from the defaults.
    pub fn builder() -> WaitConfigBuilder {
        WaitConfigBuilder::new()
    }

    /// Checks the thresholds and quanta.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the first wait after a reset
    /// wouldn't spin, if the thresholds are out of order, or if a spin burst
    /// or sleep quantum is empty.
    pub fn validate(&self) -> Result<()> {
        if self.spin_threshold < 2 {
            return Err(Error::config("spin_threshold must be at least 2"));
        }
        if self.yield_threshold < self.spin_threshold {
            return Err(Error::config(
                "yield_threshold must not be below spin_threshold",
            ));
        }
        if self.spin_hints == 0 {
            return Err(Error::config("spin_hints must be > 0"));
        }
        if self.sleep.is_zero() {
            return Err(Error::config("sleep quantum must be > 0"));
        }
        Ok(())
    }

    /// The phase for the `idle_count`-th consecutive idle wait.
    #[inline]
    pub const fn phase_for(&self, idle_count: u64) -> Phase {
        if idle_count < self.spin_threshold {
            Phase::Spin
        } else if idle_count < self.yield_threshold {
            Phase::Yield
        } else {
            Phase::Sleep
        }
    }
}

/// Builder for [`WaitConfig`].
#[derive(Debug, Default)]
pub struct WaitConfigBuilder {
    config: WaitConfig,
}

impl WaitConfigBuilder {
    /// Creates a builder holding the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idle count below which waits spin.
    pub const fn spin_threshold(mut self, n: u64) -> Self {
        self.config.spin_threshold = n;
        self
    }

    /// Sets the idle count at which waits start sleeping.
    pub const fn yield_threshold(mut self, n: u64) -> Self {
        self.config.yield_threshold = n;
        self
    }

    /// Sets the number of hint instructions per spinning wait.
    pub const fn spin_hints(mut self, n: u32) -> Self {
        self.config.spin_hints = n;
        self
    }

    /// Sets the sleep quantum.
    pub const fn sleep(mut self, quantum: Duration) -> Self {
        self.config.sleep = quantum;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// See [`WaitConfig::validate`].
    pub fn build(self) -> Result<WaitConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
