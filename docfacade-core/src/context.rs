//! Cancellable, deadline-bearing execution context.
//!
//! Every facade operation takes a [`Context`]. The driver round trip is raced
//! against the context's cancellation token and deadline, so a caller can always
//! bound how long an operation may block.
//!
//! ```ignore
//! let ctx = Context::with_timeout(Duration::from_secs(2));
//! let cursor = collection.find(&ctx, doc! {}).await?;
//! ```

use std::{future::Future, time::Duration};

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::{FacadeError, FacadeResult};

#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Wraps an existing token, e.g. a service-wide shutdown token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    /// Tightens the deadline to at most `timeout` from now. An earlier existing
    /// deadline is kept.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    /// Derives a child context. Cancelling the parent cancels the child, but not
    /// the other way around.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Runs `operation`, returning [`FacadeError::Cancelled`] as soon as the
    /// token fires or the deadline passes. An already-cancelled or expired
    /// context fails without polling the operation at all.
    pub async fn run<F, T>(&self, operation: F) -> FacadeResult<T>
    where
        F: Future<Output = FacadeResult<T>>,
    {
        if self.token.is_cancelled() {
            return Err(FacadeError::Cancelled("context cancelled".into()));
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(FacadeError::Cancelled("deadline exceeded".into()));
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FacadeError::Cancelled("context cancelled".into())),
            _ = deadline => Err(FacadeError::Cancelled("deadline exceeded".into())),
            result = operation => result,
        }
    }
}
