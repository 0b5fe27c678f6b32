//! Error type shared by every sequence, handle and coordinator in seqfan.
//!
//! A single enum, [`SequenceError`], covers:
//!
//! - upstream failures of a source sequence ([`SequenceError::Source`]);
//! - failures of a group key function ([`SequenceError::Key`]);
//! - failures while releasing a source ([`SequenceError::Release`]);
//! - a coordinator that went away mid-request ([`SequenceError::Disconnected`]);
//! - drain tasks that did not stop in time ([`SequenceError::GraceExceeded`]).
//!
//! The type is `Clone`: a sharing session latches its first error once and hands
//! the very same value to every live and future handle.
//!
//! Reaching the end of a sequence is **not** an error. `advance()` returning
//! `false` with `last_error() == None` is a clean end.

use std::time::Duration;
use thiserror::Error;

/// Value-or-error payload carried across channel boundaries.
///
/// Failures travel through the same channels as values, so a producer task can
/// route an error exactly like an item.
pub type ValErr<T> = Result<T, SequenceError>;

/// # Errors produced by sequences and sharing sessions.
///
/// Once a session latches one of these it is terminal for the whole session:
/// every handle observes the same value after draining its own backlog.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// The underlying source sequence failed while advancing.
    #[error("source failed: {error}")]
    Source {
        /// The underlying error message.
        error: String,
    },

    /// A group key function rejected an item.
    #[error("key function failed at index {index}: {error}")]
    Key {
        /// Position of the item in the source sequence.
        index: usize,
        /// The underlying error message.
        error: String,
    },

    /// Releasing the underlying source failed.
    #[error("release failed: {error}")]
    Release {
        /// The underlying error message.
        error: String,
    },

    /// The coordinator stopped before answering a request.
    #[error("coordinator disconnected")]
    Disconnected,

    /// Drain tasks were still running after the release grace period.
    #[error("release grace {grace:?} exceeded; {stuck} drain task(s) still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of drain tasks that had not stopped.
        stuck: usize,
    },
}

impl SequenceError {
    /// Shorthand for [`SequenceError::Source`].
    pub fn source(error: impl Into<String>) -> Self {
        SequenceError::Source {
            error: error.into(),
        }
    }

    /// Shorthand for [`SequenceError::Release`].
    pub fn release(error: impl Into<String>) -> Self {
        SequenceError::Release {
            error: error.into(),
        }
    }

    /// Shorthand for [`SequenceError::Key`].
    pub fn key(index: usize, error: impl Into<String>) -> Self {
        SequenceError::Key {
            index,
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use seqfan::SequenceError;
    ///
    /// let err = SequenceError::source("disk on fire");
    /// assert_eq!(err.as_label(), "sequence_source");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SequenceError::Source { .. } => "sequence_source",
            SequenceError::Key { .. } => "sequence_key",
            SequenceError::Release { .. } => "sequence_release",
            SequenceError::Disconnected => "sequence_disconnected",
            SequenceError::GraceExceeded { .. } => "sequence_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SequenceError::Source { error } => format!("source: {error}"),
            SequenceError::Key { index, error } => format!("key[{index}]: {error}"),
            SequenceError::Release { error } => format!("release: {error}"),
            SequenceError::Disconnected => "coordinator disconnected".to_string(),
            SequenceError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck drains={stuck}")
            }
        }
    }

    /// Indicates whether the error came from releasing a source.
    pub fn is_release(&self) -> bool {
        matches!(self, SequenceError::Release { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(SequenceError::key(3, "bad").as_label(), "sequence_key");
        assert_eq!(SequenceError::release("x").as_label(), "sequence_release");
        assert_eq!(
            SequenceError::Disconnected.as_label(),
            "sequence_disconnected"
        );
    }

    #[test]
    fn messages_carry_details() {
        let err = SequenceError::key(7, "not a number");
        assert_eq!(err.as_message(), "key[7]: not a number");
        assert_eq!(
            err.to_string(),
            "key function failed at index 7: not a number"
        );

        let err = SequenceError::GraceExceeded {
            grace: Duration::from_millis(10),
            stuck: 2,
        };
        assert!(err.as_message().contains("stuck drains=2"));
    }

    #[test]
    fn latched_copies_compare_equal() {
        let err = SequenceError::source("boom");
        let copy = err.clone();
        assert_eq!(err, copy);
        assert!(!err.is_release());
        assert!(SequenceError::release("boom").is_release());
    }
}
