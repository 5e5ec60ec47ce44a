//! The seven provisioning activities of a reverse replication job, in the
//! order the catalog runs them.

pub mod change_feed;
pub mod finalize_job;
pub mod launch_pipeline;
pub mod metadata_store;
pub mod register_job;
pub mod staging_store;

pub use change_feed::*;
pub use finalize_job::*;
pub use launch_pipeline::*;
pub use metadata_store::*;
pub use register_job::*;
pub use staging_store::*;

use reverse_repl_domain::{PortError, PortResult};
use saga_engine_core::{ActivityContext, ActivityError};
use std::future::Future;

/// Maps an adapter failure onto the activity error taxonomy.
pub(crate) fn port_failure(context: impl Into<String>, err: PortError) -> ActivityError {
    match err {
        PortError::Cancelled => ActivityError::Cancelled,
        other => ActivityError::external(context, other),
    }
}

/// Awaits a port call, racing it against cancellation of `ctx`.
pub(crate) async fn call_port<T, F>(
    ctx: &ActivityContext,
    context: &str,
    fut: F,
) -> Result<T, ActivityError>
where
    F: Future<Output = PortResult<T>>,
{
    ctx.guard(fut).await?.map_err(|err| port_failure(context, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_port_failure_mapping() {
        assert!(port_failure("x", PortError::Cancelled).is_cancelled());

        let err = port_failure("creating bucket", PortError::Unavailable("503".into()));
        assert_eq!(
            err.to_string(),
            "creating bucket: service unavailable: 503"
        );
    }

    #[rstest]
    #[case(PortError::AlreadyExists("b".into()))]
    #[case(PortError::NotFound("b".into()))]
    #[case(PortError::InvalidState("b".into()))]
    #[case(PortError::Unavailable("b".into()))]
    fn test_non_cancel_failures_are_external(#[case] err: PortError) {
        assert!(matches!(
            port_failure("ctx", err),
            ActivityError::External { .. }
        ));
    }

    #[tokio::test]
    async fn test_call_port_observes_cancellation() {
        let ctx = ActivityContext::new("run");
        ctx.cancellation_token().cancel();

        let result: Result<(), _> = call_port(&ctx, "never", std::future::pending()).await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
