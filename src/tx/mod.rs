//! Transaction handles.
//!
//! Adapters open one transaction per store call: `ReadOnly` for lookups and
//! similarity search, `ReadWrite` for provisioning and catalog writes.

use serde::{Deserialize, Serialize};

/// Transaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Opaque transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

/// Transaction trait that all backends must implement.
pub trait Transaction: Send + Sync {
    fn mode(&self) -> TxMode;
    fn id(&self) -> TxId;

    /// Fails with `TxError` when a write is attempted in a read-only
    /// transaction.
    fn ensure_writable(&self) -> crate::Result<()> {
        match self.mode() {
            TxMode::ReadWrite => Ok(()),
            TxMode::ReadOnly => Err(crate::Error::TxError(format!(
                "write attempted in read-only transaction {}",
                self.id().0
            ))),
        }
    }
}
