//!
//! # Error Types
//!
//! Saga-level errors. A failed saga always reports the activity that broke
//! the forward path; compensation failures travel alongside it and never
//! replace it.
//!

use thiserror::Error;

use crate::activity::ActivityError;

/// A compensation that could not undo its activity.
#[derive(Debug, Error)]
#[error("compensation of activity #{position} ({activity}) failed: {error}", position = .index + 1)]
pub struct CompensationFailure {
    /// Zero-based position of the activity in the saga.
    pub index: usize,
    pub activity: &'static str,
    #[source]
    pub error: ActivityError,
}

/// Errors returned by [`SagaOrchestrator::execute`](crate::SagaOrchestrator::execute).
#[derive(Debug, Error)]
pub enum SagaError {
    /// The transaction at `index` failed; later activities were not run.
    #[error(
        "error executing activity #{position} ({activity}): {source}{rollback}",
        position = .index + 1,
        rollback = summarize(.compensation_failures)
    )]
    ActivityFailed {
        /// Zero-based position of the failing activity.
        index: usize,
        activity: &'static str,
        #[source]
        source: ActivityError,
        compensation_failures: Vec<CompensationFailure>,
    },
}

impl SagaError {
    /// Zero-based index of the activity whose transaction failed.
    pub fn failed_index(&self) -> usize {
        match self {
            SagaError::ActivityFailed { index, .. } => *index,
        }
    }

    /// One-based position, as shown in the error message.
    pub fn failed_position(&self) -> usize {
        self.failed_index() + 1
    }

    pub fn failed_activity(&self) -> &'static str {
        match self {
            SagaError::ActivityFailed { activity, .. } => activity,
        }
    }

    pub fn cause(&self) -> &ActivityError {
        match self {
            SagaError::ActivityFailed { source, .. } => source,
        }
    }

    pub fn compensation_failures(&self) -> &[CompensationFailure] {
        match self {
            SagaError::ActivityFailed {
                compensation_failures,
                ..
            } => compensation_failures,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cause().is_cancelled()
    }
}

fn summarize(failures: &[CompensationFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let details = failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    format!(" ({} compensation(s) failed: {})", failures.len(), details)
}

/// Result type for saga operations
pub type Result<T, E = SagaError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "#1 (RegisterJob)")]
    #[case(6, "#7 (RegisterJob)")]
    fn test_position_is_index_plus_one(#[case] index: usize, #[case] expected: &str) {
        let err = SagaError::ActivityFailed {
            index,
            activity: "RegisterJob",
            source: ActivityError::Cancelled,
            compensation_failures: vec![],
        };
        assert!(err.to_string().contains(expected));
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_activity_failed_message_uses_one_based_position() {
        let err = SagaError::ActivityFailed {
            index: 3,
            activity: "PrepareMetadataStore",
            source: ActivityError::invalid_state("boom"),
            compensation_failures: vec![],
        };

        assert_eq!(err.failed_index(), 3);
        assert_eq!(err.failed_position(), 4);
        assert_eq!(
            err.to_string(),
            "error executing activity #4 (PrepareMetadataStore): invalid resource state: boom"
        );
    }

    #[test]
    fn test_compensation_failures_are_reported_with_original_error() {
        let err = SagaError::ActivityFailed {
            index: 2,
            activity: "PrepareChangeFeed",
            source: ActivityError::invalid_state("feed options"),
            compensation_failures: vec![CompensationFailure {
                index: 1,
                activity: "PrepareStagingStore",
                error: ActivityError::external("deleting bucket", "not empty"),
            }],
        };

        let msg = err.to_string();
        assert!(msg.starts_with("error executing activity #3 (PrepareChangeFeed)"));
        assert!(msg.contains("1 compensation(s) failed"));
        assert!(msg.contains("activity #2 (PrepareStagingStore)"));
        assert_eq!(err.compensation_failures().len(), 1);
        assert!(!err.is_cancelled());
    }
}
