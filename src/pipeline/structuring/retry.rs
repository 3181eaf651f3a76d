use std::future::Future;
use std::time::Duration;

use super::parser::{extract_structured, StructuredRecord};
use super::types::{GenerationRequest, LlmClient};
use super::StageError;

/// Default attempts per generator call (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed wait between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Bounded retry with a fixed delay. No backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Attempts actually made; zero is treated as one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Upper bound on time spent sleeping between attempts.
    pub fn total_delay(&self) -> Duration {
        self.delay * (self.attempts() - 1)
    }
}

/// Run `op` until it succeeds or the policy's attempts run out.
///
/// The last error is returned unmodified.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, StageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StageError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        tracing::debug!(stage = label, attempt, max_attempts = attempts, "Calling generator");

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    stage = label,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    stage = label,
                    attempts,
                    error = %e,
                    "All attempts failed"
                );
                return Err(e);
            }
        }
    }
}

/// Generate and extract a `T`, retrying both steps together.
///
/// The final failure is wrapped in [`StageError::RetryExhausted`].
pub async fn invoke_structured<T: StructuredRecord>(
    llm: &dyn LlmClient,
    request: &GenerationRequest,
    policy: &RetryPolicy,
    label: &str,
) -> Result<T, StageError> {
    with_retry(policy, label, move || async move {
        let raw = llm.generate(request).await?;
        extract_structured::<T>(&raw)
    })
    .await
    .map_err(|e| StageError::RetryExhausted {
        attempts: policy.attempts(),
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskRecord;
    use crate::pipeline::structuring::{GenerationKnobs, MockLlmClient, MockReply};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
        assert_eq!(policy.total_delay(), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&fast(3), "test", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(StageError::CollaboratorUnavailable("down".into()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_last_error_unmodified() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&fast(2), "test", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err(StageError::MalformedOutput(format!("attempt {n}")))
        })
        .await;
        match result {
            Err(StageError::MalformedOutput(msg)) => assert_eq!(msg, "attempt 2"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let _: Result<(), _> = with_retry(&fast(0), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StageError::CollaboratorUnavailable("x".into()))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invoke_structured_recovers_from_garbage() {
        let llm = MockLlmClient::new(r#"{"alerts": []}"#).then(MockReply::text("not json at all"));
        let request = GenerationKnobs::structured("m").request("sys", "p".into());
        let record: RiskRecord = invoke_structured(&llm, &request, &fast(3), "risk")
            .await
            .unwrap();
        assert!(record.alerts.is_empty());
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn invoke_structured_wraps_final_failure() {
        let llm = MockLlmClient::new("garbage");
        let request = GenerationKnobs::structured("m").request("sys", "p".into());
        let err = invoke_structured::<RiskRecord>(&llm, &request, &fast(3), "risk")
            .await
            .unwrap_err();
        match &err {
            StageError::RetryExhausted { attempts, .. } => assert_eq!(*attempts, 3),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(err.root(), StageError::MalformedOutput(_)));
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn waits_the_fixed_delay_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(20),
        };
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let start = tokio::time::Instant::now();
        let _: Result<(), _> = with_retry(&policy, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StageError::CollaboratorUnavailable("down".into()))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two waits between three attempts, none after the last.
        assert!(start.elapsed() >= policy.total_delay());
        assert_eq!(policy.total_delay(), Duration::from_millis(40));
    }
}
