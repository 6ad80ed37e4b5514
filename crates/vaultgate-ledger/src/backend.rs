// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - EXTERNAL TRANSFER BACKEND
//
// Seam between the ledger and whatever settlement layer executes payouts.
// The ledger commits its local state change BEFORE calling submit() and
// rolls back if submit() fails — the backend is allowed to stall, reject,
// or call back into the ledger without breaking conservation.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::address::Address;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receipt for a successfully submitted payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_id: String,
}

/// Why a payout submission did not go through.
///
/// Rejections and timeouts are kept distinguishable so the audit log can
/// tell "the settlement layer said no" from "the settlement layer never
/// answered". Both trigger the same local rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    Rejected(String),
    Timeout,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Rejected(reason) => write!(f, "payout rejected: {}", reason),
            SubmitError::Timeout => write!(f, "payout timed out"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// External settlement layer. Implementations must be callable from any
/// thread; the ledger never holds an account lock across `submit`.
pub trait TransferBackend: Send + Sync {
    fn submit(&self, recipient: &Address, amount: u128) -> Result<TxReceipt, SubmitError>;
}

/// Always-succeeding backend for dev mode and tests.
/// Receipts carry a process-local sequence number so tests can assert on
/// distinct submissions.
#[derive(Default)]
pub struct NullBackend {
    seq: AtomicU64,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransferBackend for NullBackend {
    fn submit(&self, recipient: &Address, amount: u128) -> Result<TxReceipt, SubmitError> {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        Ok(TxReceipt {
            tx_id: format!("null-{}-{}-{}", n, recipient, amount),
        })
    }
}
