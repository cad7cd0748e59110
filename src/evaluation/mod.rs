//! The condition evaluation core: per-condition comparison, logic
//! combination, fire control, and the per-alert evaluation loop.

pub mod combiner;
pub mod condition;
pub mod context;
pub mod engine;
pub mod error;
pub mod firing;

pub use combiner::{CombineResult, LogicCombiner};
pub use condition::ConditionEvaluator;
pub use context::EvalContext;
pub use engine::AlertEngine;
pub use error::EvalError;
pub use firing::FireController;

use std::future::Future;
use std::time::Duration;

/// Wrap a collaborator call with a timeout bound. Timeouts abort the
/// evaluation cycle; they are never treated as satisfied/unsatisfied.
pub(crate) async fn bounded<T, F>(
    timeout: Duration,
    collaborator: &'static str,
    fut: F,
) -> Result<T, EvalError>
where
    F: Future<Output = Result<T, EvalError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(EvalError::Timeout {
            collaborator,
            timeout,
        }),
    }
}
