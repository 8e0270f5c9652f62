use std::{future::Future, time::Duration};

use rand::Rng;

use super::{DaoLayerError, DaoResult, error::is_busy};

const MAX_ATTEMPTS: u32 = 10;
const BASE_DELAY_MS: u64 = 10;

/// Re-runs a whole transaction while SQLite reports lock contention. `run`
/// must open, and on failure roll back, its own transaction.
pub(crate) async fn retry_when_busy<T, F, Fut>(mut run: F) -> DaoResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DaoResult<T>>,
{
    let mut attempt = 1;
    loop {
        match run().await {
            Err(DaoLayerError::Db(err)) if attempt < MAX_ATTEMPTS && is_busy(&err) => {
                let jitter = rand::thread_rng().gen_range(0..BASE_DELAY_MS);
                let delay = Duration::from_millis(BASE_DELAY_MS * u64::from(attempt) + jitter);
                tracing::debug!(attempt, ?delay, "database busy, retrying transaction");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
