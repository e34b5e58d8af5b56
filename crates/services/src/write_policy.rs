use std::future::Future;

use storage::StoreError;

/// What happens once a write has used up its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureAction {
    /// Log the failure and report no result to the caller.
    #[default]
    LogAndContinue,
    /// Hand the error back to the caller.
    Surface,
}

/// Retry and failure handling for background writes.
///
/// Playback and preference writes default to a single attempt whose failure
/// is logged and dropped: losing one progress tick is acceptable, blocking
/// the player is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    pub retries: u32,
    pub on_failure: FailureAction,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self::FIRE_AND_FORGET
    }
}

impl WritePolicy {
    pub const FIRE_AND_FORGET: Self = Self {
        retries: 0,
        on_failure: FailureAction::LogAndContinue,
    };

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn with_on_failure(mut self, on_failure: FailureAction) -> Self {
        self.on_failure = on_failure;
        self
    }

    /// Run `write`, retrying transient failures up to `retries` more times.
    ///
    /// Returns `Ok(None)` when the write failed under `LogAndContinue`.
    ///
    /// # Errors
    ///
    /// Returns the last `StoreError` when the policy is `Surface`.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &'static str,
        mut write: F,
    ) -> Result<Option<T>, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let err = match write().await {
                Ok(value) => return Ok(Some(value)),
                Err(err) => err,
            };
            if attempt < self.retries && err.is_transient() {
                attempt += 1;
                tracing::debug!(operation, attempt, error = %err, "retrying write");
                continue;
            }
            return match self.on_failure {
                FailureAction::LogAndContinue => {
                    tracing::warn!(
                        operation,
                        attempts = attempt + 1,
                        error = %err,
                        "write failed; continuing without it"
                    );
                    Ok(None)
                }
                FailureAction::Surface => Err(err),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn failing(calls: &AtomicU32, err: StoreError) -> Result<(), StoreError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(err)
    }

    #[tokio::test]
    async fn default_policy_makes_one_attempt_and_swallows() {
        let calls = AtomicU32::new(0);
        let result = WritePolicy::default()
            .execute("test", || failing(&calls, StoreError::Timeout))
            .await;
        assert_eq!(result, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_only_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = WritePolicy::default().with_retries(2);
        let _ = policy
            .execute("test", || failing(&calls, StoreError::Status(503)))
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let calls = AtomicU32::new(0);
        let _ = policy
            .execute("test", || failing(&calls, StoreError::Rejected("no".into())))
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn surface_returns_the_error() {
        let calls = AtomicU32::new(0);
        let result = WritePolicy::default()
            .with_on_failure(FailureAction::Surface)
            .execute("test", || failing(&calls, StoreError::Status(500)))
            .await;
        assert_eq!(result, Err(StoreError::Status(500)));
    }

    #[tokio::test]
    async fn success_is_returned() {
        let result = WritePolicy::default()
            .execute("test", || async { Ok::<_, StoreError>(42) })
            .await;
        assert_eq!(result, Ok(Some(42)));
    }
}
