//! # Activity - Unit of Orchestration
//!
//! An [`Activity`] bundles a forward `transaction` with the `compensation`
//! that undoes it. Activities own their input (fixed at construction) and
//! their output (filled in by a successful transaction), so the orchestrator
//! only ever sees the capability pair and never a concrete type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Boxed error type used to carry adapter failures through an activity.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by an activity transaction or compensation.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// A call to an external resource manager failed.
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The external resource exists but is not in the state this activity requires.
    #[error("invalid resource state: {0}")]
    InvalidState(String),

    /// Input or output could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The shared execution context was cancelled.
    #[error("activity cancelled")]
    Cancelled,
}

impl ActivityError {
    pub fn external(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::External {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ActivityError::Cancelled)
    }
}

/// Ambient execution context shared by every activity of one saga run.
///
/// Carries the run identifier (embedded in every resource name the run
/// creates) and the cancellation token callers use to unblock in-flight
/// external calls.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    run_id: String,
    cancellation_token: CancellationToken,
    started_at: DateTime<Utc>,
}

impl ActivityContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self::with_cancellation_token(run_id, CancellationToken::new())
    }

    pub fn with_cancellation_token(
        run_id: impl Into<String>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            cancellation_token,
            started_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Completes when cancellation is requested.
    pub async fn cancelled(&self) {
        self.cancellation_token.cancelled().await
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// Same run, fresh token. Used for rollback so that the cancellation
    /// which aborted the forward path does not also abort compensation.
    pub fn detached(&self) -> Self {
        Self {
            run_id: self.run_id.clone(),
            cancellation_token: CancellationToken::new(),
            started_at: self.started_at,
        }
    }

    /// Races `fut` against cancellation of this context.
    ///
    /// Returns [`ActivityError::Cancelled`] as soon as the token fires; the
    /// pending future is dropped.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, ActivityError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => Err(ActivityError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

/// One orchestration step: a forward action and its rollback.
///
/// Implementations must be idempotent: running `transaction` against a
/// resource that already exists in the desired state is a success, not a
/// failure. `compensation` must only undo what this instance's
/// `transaction` actually created.
#[async_trait]
pub trait Activity: Send + Sync {
    /// Stable name for logs and error reports.
    fn name(&self) -> &'static str;

    /// Performs the forward action, populating the activity's output.
    async fn transaction(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError>;

    /// Undoes the effect of a previously successful `transaction`.
    async fn compensation(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError>;
}
