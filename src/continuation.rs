//! Single-use reply continuation for a pending `Next()` caller.

use tokio::sync::oneshot;
use tracing::warn;

use crate::error::SieveError;
use crate::message::NextReply;

/// Handle to the caller of `Next()`, captured when a round starts and
/// resolved once when it ends. A second resolve is refused at runtime.
#[derive(Debug)]
pub struct ReplyContinuation {
    tx: Option<oneshot::Sender<NextReply>>,
}

impl ReplyContinuation {
    pub fn new(tx: oneshot::Sender<NextReply>) -> Self {
        ReplyContinuation { tx: Some(tx) }
    }

    #[cfg(test)]
    pub(crate) fn is_spent(&self) -> bool {
        self.tx.is_none()
    }

    /// Delivers `value` to the caller. A caller that stopped waiting is logged, not an error.
    pub fn resolve(&mut self, value: NextReply) -> Result<(), SieveError> {
        let tx = self.tx.take().ok_or(SieveError::ContinuationSpent)?;
        if tx.send(value).is_err() {
            warn!("caller dropped before its reply was delivered");
        }
        Ok(())
    }
}
