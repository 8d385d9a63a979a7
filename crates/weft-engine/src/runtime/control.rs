//! Cancellation helpers for streaming execution.

use futures::future::pending;
use tokio_util::sync::CancellationToken;

/// Token a consumer cancels to abort an in-flight turn.
pub type TurnCancellationToken = CancellationToken;

/// Result of racing a future against cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelAware<T> {
    Value(T),
    Cancelled,
}

/// Whether the token, if any, has been cancelled.
pub fn is_cancelled(token: Option<&TurnCancellationToken>) -> bool {
    token.is_some_and(TurnCancellationToken::is_cancelled)
}

/// Race `fut` against cancellation. Without a token the future always wins.
///
/// On cancellation the future is dropped, releasing any in-flight model or
/// tool call it owns.
pub async fn await_or_cancel<T, F>(token: Option<&TurnCancellationToken>, fut: F) -> CancelAware<T>
where
    F: std::future::Future<Output = T>,
{
    if let Some(token) = token {
        tokio::select! {
            _ = token.cancelled() => CancelAware::Cancelled,
            value = fut => CancelAware::Value(value),
        }
    } else {
        CancelAware::Value(fut.await)
    }
}

/// Wait for the token to fire; waits forever when no token was supplied.
pub async fn cancelled(token: Option<&TurnCancellationToken>) {
    if let Some(token) = token {
        token.cancelled().await;
    } else {
        pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn await_or_cancel_returns_value_without_token() {
        let out = await_or_cancel(None, async { 42usize }).await;
        assert_eq!(out, CancelAware::Value(42));
    }

    #[tokio::test]
    async fn await_or_cancel_resolves_quickly_after_cancellation() {
        let token = TurnCancellationToken::new();
        let token_for_task = token.clone();
        let handle = tokio::spawn(async move {
            await_or_cancel(Some(&token_for_task), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                7usize
            })
            .await
        });

        token.cancel();
        let out = timeout(Duration::from_millis(300), handle)
            .await
            .expect("should resolve promptly after cancellation")
            .expect("task should not panic");
        assert_eq!(out, CancelAware::Cancelled);
    }

    #[tokio::test]
    async fn is_cancelled_reflects_token_state() {
        assert!(!is_cancelled(None));
        let token = TurnCancellationToken::new();
        assert!(!is_cancelled(Some(&token)));
        token.cancel();
        assert!(is_cancelled(Some(&token)));
    }
}
