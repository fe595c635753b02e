use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Default time allowed to resolve a server address
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `fut` to completion or fail with `ProtocolError::Timeout`
pub async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| ProtocolError::Timeout)
}
