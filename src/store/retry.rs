use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::warn;

use crate::store::error::StoreResult;

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(200);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(2);
const MAX_ATTEMPTS: u32 = 4;

/// Run a store operation, retrying with doubling delays while the
/// backend reports itself unavailable.
///
/// Callers hand over idempotent operations only: a retried attempt must
/// land exactly the state the first attempt would have landed.
pub async fn with_backoff<T, F, Fut>(operation_name: &str, mut operation: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut delay = INITIAL_RETRY_DELAY;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < MAX_ATTEMPTS => {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %error,
                    "store operation failed; retrying"
                );
                sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
                attempt += 1;
            }
            Err(error) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %error,
                    "store operation failed; giving up"
                );
                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use crate::store::error::StoreError;

    use super::*;

    fn unavailable() -> StoreError {
        StoreError::unavailable("backend down".into(), std::io::Error::other("refused"))
    }

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_on_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_backoff("write", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_backend_recovers() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_backoff("write", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(unavailable())
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_last_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: StoreResult<()> = with_backoff("write", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }
}
