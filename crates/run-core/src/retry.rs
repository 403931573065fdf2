use std::future::Future;
use std::time::Duration;

use rand::Rng;

pub const MAX_RATE_LIMIT_ATTEMPTS: u32 = 5;

/// Result of one attempt, so callers can surface a server-advertised
/// retry delay (`Retry-After`-style hints) without the retry loop
/// knowing anything about HTTP.
pub enum AttemptOutcome<T> {
    Done(T),
    RateLimited { server_hint: Option<Duration> },
}

/// `15 * 2^attempt` seconds of backoff, honoring a server-advertised
/// delay when the attempt reports one, up to `MAX_RATE_LIMIT_ATTEMPTS`
/// tries. Returns the last rate-limit hint on exhaustion so the caller
/// can build an `LlmRateLimited` error.
pub async fn with_rate_limit_backoff<T, F, Fut>(mut attempt: F) -> Result<T, u32>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
{
    for n in 0..MAX_RATE_LIMIT_ATTEMPTS {
        match attempt(n).await {
            AttemptOutcome::Done(value) => return Ok(value),
            AttemptOutcome::RateLimited { server_hint } => {
                if n + 1 == MAX_RATE_LIMIT_ATTEMPTS {
                    return Err(MAX_RATE_LIMIT_ATTEMPTS);
                }
                let backoff = server_hint.unwrap_or_else(|| base_backoff(n));
                tokio::time::sleep(backoff).await;
            }
        }
    }
    Err(MAX_RATE_LIMIT_ATTEMPTS)
}

fn base_backoff(attempt: u32) -> Duration {
    let seconds = 15u64.saturating_mul(1u64 << attempt.min(10));
    let jitter_ms = rand::thread_rng().gen_range(0..250);
    Duration::from_secs(seconds) + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_sleeping_on_first_try() {
        let calls = AtomicU32::new(0);
        let result = with_rate_limit_backoff(|_n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { AttemptOutcome::Done(42) }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let result: Result<(), u32> = with_rate_limit_backoff(|_n| async {
            AttemptOutcome::RateLimited {
                server_hint: Some(Duration::from_millis(1)),
            }
        })
        .await;
        assert_eq!(result, Err(MAX_RATE_LIMIT_ATTEMPTS));
    }
}
