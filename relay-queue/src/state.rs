//! Lifecycle state shared between a controlling thread and worker loops.
//!
//! One atomic word replaces a set of independent flags (`initialized`,
//! `running`, `paused`, `stopping`). A hot loop checks it with a single
//! acquire load, and every transition is a release store or a
//! compare-exchange, so whatever the controller wrote before changing the
//! state is visible to a worker that observes the new state.
//!
//! ```
//! use relay_queue::{AtomicRunState, RunState};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let state = Arc::new(AtomicRunState::new(RunState::Running));
//!
//! let worker = {
//!     let state = Arc::clone(&state);
//!     thread::spawn(move || {
//!         let mut spins = 0u64;
//!         while state.is_running() {
//!             spins += 1;
//!             std::hint::spin_loop();
//!         }
//!         spins
//!     })
//! };
//!
//! state.transition(RunState::Running, RunState::Stopping).unwrap();
//! worker.join().unwrap();
//! ```

use std::fmt;

use crate::sync::{AtomicU8, Ordering};

/// Lifecycle states, in the order a component normally moves through them.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Constructed, not yet started.
    Init = 0,
    /// Processing.
    Running = 1,
    /// Temporarily not processing.
    Paused = 2,
    /// Asked to stop; draining.
    Stopping = 3,
    /// Stopped.
    Stopped = 4,
}

impl RunState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Init,
            1 => Self::Running,
            2 => Self::Paused,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A [`RunState`] in one atomic byte.
pub struct AtomicRunState {
    state: AtomicU8,
}

impl AtomicRunState {
    /// Creates a state word holding `state`.
    pub fn new(state: RunState) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
        }
    }

    /// Reads the current state (acquire).
    #[inline]
    pub fn load(&self) -> RunState {
        RunState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Unconditionally sets the state (release).
    #[inline]
    pub fn store(&self, state: RunState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Moves from `from` to `to` if the current state is `from`.
    ///
    /// # Errors
    ///
    /// Returns the actual current state if it wasn't `from`.
    pub fn transition(&self, from: RunState, to: RunState) -> Result<(), RunState> {
        match self.state.compare_exchange(
            from as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                tracing::debug!(%from, %to, "run state transition");
                Ok(())
            }
            Err(raw) => Err(RunState::from_raw(raw)),
        }
    }

    /// Returns `true` if the state is [`RunState::Running`].
    #[inline]
    pub fn is_running(&self) -> bool {
        self.load() == RunState::Running
    }
}

impl Default for AtomicRunState {
    fn default() -> Self {
        Self::new(RunState::Init)
    }
}

impl fmt::Debug for AtomicRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicRunState").field(&self.load()).finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;
    use std::thread;

    #[test]
    fn round_trips_every_state() {
        let state = AtomicRunState::default();
        assert_eq!(state.load(), RunState::Init);

        for s in [
            RunState::Running,
            RunState::Paused,
            RunState::Stopping,
            RunState::Stopped,
            RunState::Init,
        ] {
            state.store(s);
            assert_eq!(state.load(), s);
        }
    }

    #[test]
    fn transition_checks_current_state() {
        let state = AtomicRunState::new(RunState::Init);

        assert_eq!(
            state.transition(RunState::Running, RunState::Paused),
            Err(RunState::Init)
        );
        assert_eq!(state.transition(RunState::Init, RunState::Running), Ok(()));
        assert!(state.is_running());
        assert_eq!(state.transition(RunState::Running, RunState::Paused), Ok(()));
        assert!(!state.is_running());
    }

    #[test]
    fn stop_publishes_prior_writes() {
        let state = Arc::new(AtomicRunState::new(RunState::Running));
        let payload = Arc::new(AtomicU64::new(0));

        let worker = {
            let state = Arc::clone(&state);
            let payload = Arc::clone(&payload);
            thread::spawn(move || {
                while state.is_running() {
                    std::hint::spin_loop();
                }
                payload.load(std::sync::atomic::Ordering::Relaxed)
            })
        };

        payload.store(42, std::sync::atomic::Ordering::Relaxed);
        state.store(RunState::Stopping);

        assert_eq!(worker.join().unwrap(), 42);
    }

    #[test]
    fn display_names() {
        assert_eq!(RunState::Stopping.to_string(), "stopping");
        assert_eq!(format!("{:?}", AtomicRunState::new(RunState::Paused)), "AtomicRunState(Paused)");
    }
}
