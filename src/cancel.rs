//! Cancellation and deadline propagation for network-bound calls

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{Result, RetrievalError};

/// Per-request call context threaded through every blocking step
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context with a fresh token and no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Context bound to an existing cancellation token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Set a deadline relative to now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancelled or past the deadline
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail fast with [`RetrievalError::Cancelled`] if already done
    pub fn check(&self) -> Result<()> {
        if self.is_done() {
            return Err(RetrievalError::Cancelled);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled first
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(RetrievalError::Cancelled),
            _ = deadline => Err(RetrievalError::Cancelled),
            res = fut => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = CallContext::new();
        let value = ctx.run(async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_cancelled_before_run() {
        let ctx = CallContext::new();
        ctx.cancel();
        let res = ctx.run(async { Ok(1) }).await;
        assert!(matches!(res, Err(RetrievalError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_while_pending() {
        let ctx = CallContext::new();
        let token = ctx.token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let res: Result<()> = ctx.run(std::future::pending()).await;
        assert!(matches!(res, Err(RetrievalError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_elapses() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(5));
        let res: Result<()> = ctx.run(std::future::pending()).await;
        assert!(matches!(res, Err(RetrievalError::Cancelled)));
    }
}
