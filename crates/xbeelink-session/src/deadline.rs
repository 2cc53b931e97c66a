use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{Result, SessionError};

/// Run `operation` with a time limit.
///
/// On expiry the operation future is dropped, which releases any frame id it
/// holds, and `SessionError::Timeout(limit)` is returned. Whichever of
/// response and timer completes first decides the outcome; the other is
/// discarded.
pub(crate) async fn within<T, F>(limit: Duration, frame_id: u8, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(outcome) => outcome,
        Err(_elapsed) => {
            warn!(
                frame_id,
                timeout_ms = limit.as_millis() as u64,
                "request timed out"
            );
            Err(SessionError::Timeout(limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn completes_before_limit() {
        let value = within(Duration::from_millis(100), 1, async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn expires_after_limit() {
        let started = Instant::now();
        let outcome: Result<()> = within(
            Duration::from_millis(50),
            1,
            std::future::pending::<Result<()>>(),
        )
        .await;

        assert!(matches!(outcome, Err(SessionError::Timeout(d)) if d == Duration::from_millis(50)));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn inner_error_is_passed_through() {
        let outcome: Result<()> = within(Duration::from_millis(50), 1, async {
            Err(SessionError::CommandFailed("ERROR".to_string()))
        })
        .await;
        assert!(matches!(outcome, Err(SessionError::CommandFailed(_))));
    }
}
