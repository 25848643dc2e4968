//! Error types.

use std::fmt;

/// Result alias for fallible construction and configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors. Raised at construction time, never by queue operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The requested queue capacity is zero or not a power of two.
    #[error("queue capacity must be a non-zero power of two, got {capacity}")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// A wait strategy configuration failed validation.
    #[error("invalid wait configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Returned by `try_push` when the queue is full. Carries the rejected value.
///
/// Full is a transient condition: the caller may retry, back off or drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Returns the value that couldn't be pushed.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full")
    }
}

impl<T: fmt::Debug> std::error::Error for Full<T> {}
