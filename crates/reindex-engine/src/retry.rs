//! Single-retry wrapper for bulk network calls.
//!
//! A transient client error earns exactly one more attempt. A second
//! transient error, or any other error, is returned unchanged.

use std::future::Future;

use tracing::{debug, warn};

use reindex_types::ClientError;

/// Total attempts for one bulk call.
pub const MAX_ATTEMPTS: u32 = 2;

/// Run `call`, retrying once if it fails with a transient error.
pub async fn with_retry<T, F, Fut>(operation: &str, mut call: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;
        debug!(operation, attempt = attempts, "Issuing bulk call");

        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempts < MAX_ATTEMPTS => {
                warn!(operation, error = %e, "Transient bulk failure, retrying once");
            }
            Err(e) => return Err(e),
        }
    }
}
