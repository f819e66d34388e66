// 🧭 Request Context - typed per-request values passed by parameter
//
// Carries who is calling, how long the call may take, whether the caller has
// gone away, and the tracing span every log line of the request belongs to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Span;
use uuid::Uuid;

use crate::error::{Result, WalletError};

#[derive(Debug, Clone)]
pub struct RequestContext {
    caller: Option<i64>,
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
    span: Span,
}

impl RequestContext {
    /// Context for an inbound request; `caller` is the authenticated account id
    pub fn new(caller: Option<i64>) -> Self {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            caller = tracing::field::Empty,
        );
        if let Some(id) = caller {
            span.record("caller", id);
        }

        RequestContext {
            caller,
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            span,
        }
    }

    /// Context for operator actions outside any HTTP request
    pub fn background() -> Self {
        Self::new(None)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Caller id, or `Unauthorized` when the request carried no identity
    pub fn require_caller(&self) -> Result<i64> {
        self.caller.ok_or(WalletError::Unauthorized)
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Guard that cancels this context when dropped.
    /// Hold it in the async handler: if the handler future is dropped
    /// mid-flight, blocking work still running sees the cancellation.
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop(self.cancelled.clone())
    }

    /// `Internal` once cancelled or past the deadline
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(WalletError::Internal("request cancelled".into()));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(WalletError::Internal("request deadline exceeded".into()));
            }
        }
        Ok(())
    }
}

pub struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}
