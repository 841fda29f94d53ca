use crate::traits::UpstreamError;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Result of a pipeline call: the upstream's answer, or the fallback that
/// stood in for it and the reason why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Answered(T),
    Degraded { fallback: T, cause: UpstreamError },
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Outcome::Answered(value) => value,
            Outcome::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Answered(value) => value,
            Outcome::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn cause(&self) -> Option<&UpstreamError> {
        match self {
            Outcome::Answered(_) => None,
            Outcome::Degraded { cause, .. } => Some(cause),
        }
    }
}

/// Drive `attempt` to completion and fold every failure, a panicking
/// client included, into a degraded outcome.
pub(crate) async fn settle<T, F>(attempt: F, fallback: impl FnOnce() -> T) -> Outcome<T>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match AssertUnwindSafe(attempt).catch_unwind().await {
        Ok(Ok(value)) => Outcome::Answered(value),
        Ok(Err(cause)) => Outcome::Degraded {
            fallback: fallback(),
            cause,
        },
        Err(_) => Outcome::Degraded {
            fallback: fallback(),
            cause: UpstreamError::Transport("upstream client panicked".to_string()),
        },
    }
}
