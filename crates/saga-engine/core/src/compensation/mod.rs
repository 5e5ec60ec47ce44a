//! # Compensation
//!
//! Reverse-order rollback of the activities a saga already completed.
//!
//! ```text
//! Saga:          [Act 0] → [Act 1] → [Act 2] → [FAIL!]
//! Compensation:                        [Comp 2] → [Comp 1] → [Comp 0]
//!                (LIFO, every compensation attempted)
//! ```

use tracing::{error, info};

use crate::activity::{Activity, ActivityContext};
use crate::error::CompensationFailure;

/// Runs `compensation` on every activity in `completed`, last first.
///
/// A failing compensation does not stop the rollback; every failure is
/// collected and returned so the caller can report it next to the
/// original error.
pub async fn compensate_in_reverse(
    ctx: &ActivityContext,
    completed: &mut [&mut dyn Activity],
) -> Vec<CompensationFailure> {
    let mut failures = Vec::new();

    for index in (0..completed.len()).rev() {
        let activity = &mut *completed[index];
        let name = activity.name();

        match activity.compensation(ctx).await {
            Ok(()) => {
                info!(run_id = %ctx.run_id(), activity = name, index, "Compensation completed");
            }
            Err(err) => {
                error!(
                    run_id = %ctx.run_id(),
                    activity = name,
                    index,
                    error = %err,
                    "Compensation failed, continuing rollback"
                );
                failures.push(CompensationFailure {
                    index,
                    activity: name,
                    error: err,
                });
            }
        }
    }

    failures
}
