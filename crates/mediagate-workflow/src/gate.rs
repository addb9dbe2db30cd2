use mediagate_core::AppError;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

/// Single mutual-exclusion point serializing every engine operation.
///
/// Waiters are served in FIFO order. The gate is not reentrant: code that
/// already holds a [`GatePermit`] must pass it down instead of entering again.
#[derive(Clone, Debug, Default)]
pub struct Gate {
    lock: Arc<Mutex<()>>,
}

/// Proof that the gate is held; released on drop.
#[derive(Debug)]
pub struct GatePermit {
    _guard: OwnedMutexGuard<()>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the gate.
    ///
    /// Returns `Cancelled` without holding anything if `cancel` fires first,
    /// including when it was already cancelled on entry.
    pub async fn enter(&self, cancel: &CancellationToken) -> Result<GatePermit, AppError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Gate wait cancelled");
                Err(AppError::Cancelled)
            }
            guard = Arc::clone(&self.lock).lock_owned() => Ok(GatePermit { _guard: guard }),
        }
    }

    /// Whether some caller currently holds the gate.
    pub fn is_held(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
