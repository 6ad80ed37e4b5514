// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - LEDGER MODULE
//
// Conservation-safe account ledger: per-account balances plus a pending
// distribution queue. All financial arithmetic uses u128 with explicit
// checked/saturating operations (no floating point, no implicit wraparound).
// Mutations serialize per account; disjoint accounts do not contend.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod address;
pub mod backend;

pub use address::{Address, AddressParseError, ADDRESS_BYTES};
pub use backend::{NullBackend, SubmitError, TransferBackend, TxReceipt};

/// 1 VGT = 1_000_000_000 grain (10^9 precision). All ledger amounts are
/// denominated in grain.
pub const GRAIN_PER_VGT: u128 = 1_000_000_000;

/// Default cap on recipients per distribution batch. A batch walk is the
/// only linear-cost mutation path, so its length must stay caller-bounded.
pub const DEFAULT_MAX_BATCH: usize = 256;

/// Recover from a poisoned mutex instead of panicking.
/// A panic while holding an account lock must not cascade into every
/// subsequent operation on that account.
fn safe_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn safe_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn safe_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ─────────────────────────────────────────────────────────────────
// ERROR TAXONOMY
// ─────────────────────────────────────────────────────────────────

/// Every way a ledger mutation can fail. Each variant has a stable wire
/// code consumed by the gateway error mapper; messages are deterministic
/// and carry no internal diagnostic state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Caller does not hold the capability the operation requires
    Unauthorized,
    /// Zero amount where the operation requires a positive one
    InvalidAmount,
    /// Distribution batch contains the same address twice
    DuplicateRecipient,
    InsufficientBalance,
    /// Claim on an account with no pending distribution
    NothingToClaim,
    /// Distribution batch exceeds the configured recipient cap
    BatchTooLarge { len: usize, max: usize },
    /// The operation would exceed u128 width (no partial effect applied)
    ArithmeticOverflow,
    /// External payout rejected or timed out; local state was rolled back
    TransferFailed(SubmitError),
}

impl LedgerError {
    /// Stable machine-readable code for logs and wire bodies.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Unauthorized => "unauthorized",
            LedgerError::InvalidAmount => "invalid_amount",
            LedgerError::DuplicateRecipient => "duplicate_recipient",
            LedgerError::InsufficientBalance => "insufficient_balance",
            LedgerError::NothingToClaim => "nothing_to_claim",
            LedgerError::BatchTooLarge { .. } => "batch_too_large",
            LedgerError::ArithmeticOverflow => "arithmetic_overflow",
            LedgerError::TransferFailed(_) => "transfer_failed",
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Unauthorized => {
                write!(f, "caller lacks the capability for this operation")
            }
            LedgerError::InvalidAmount => write!(f, "amount must be greater than zero"),
            LedgerError::DuplicateRecipient => {
                write!(f, "distribution recipients must be distinct")
            }
            LedgerError::InsufficientBalance => write!(f, "insufficient balance"),
            LedgerError::NothingToClaim => write!(f, "no pending distribution to claim"),
            LedgerError::BatchTooLarge { len, max } => {
                write!(f, "batch of {} recipients exceeds limit of {}", len, max)
            }
            LedgerError::ArithmeticOverflow => write!(f, "amount exceeds integer width"),
            LedgerError::TransferFailed(e) => write!(f, "transfer failed ({}), rolled back", e),
        }
    }
}

impl std::error::Error for LedgerError {}

// ─────────────────────────────────────────────────────────────────
// ACCOUNT STATE & ROLES
// ─────────────────────────────────────────────────────────────────

/// Per-account state. Invariant at every observable point:
/// both fields are plain u128 values that only move through checked
/// arithmetic, and sum(balance) + sum(pending) + paid_out == minted
/// across the whole ledger.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountState {
    pub balance: u128,
    pub pending: u128,
}

/// Capability table: exactly one owner, a set of minter addresses.
/// Loaded once at construction and immutable for the process lifetime.
/// The owner is always a member of the minter set.
#[derive(Debug, Clone)]
pub struct Roles {
    owner: Address,
    minters: BTreeSet<Address>,
}

impl Roles {
    pub fn new(owner: Address, extra_minters: impl IntoIterator<Item = Address>) -> Self {
        let mut minters: BTreeSet<Address> = extra_minters.into_iter().collect();
        minters.insert(owner);
        Roles { owner, minters }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn is_minter(&self, addr: &Address) -> bool {
        self.minters.contains(addr)
    }
}

/// Conservation counters. `minted` includes the initial supply credited
/// to the owner; `paid_out` is everything successfully transferred out
/// through the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupplyTotals {
    pub minted: u128,
    pub paid_out: u128,
}

// ─────────────────────────────────────────────────────────────────
// LEDGER
// ─────────────────────────────────────────────────────────────────

type AccountEntry = Arc<Mutex<AccountState>>;

/// The authoritative balance store.
///
/// Locking model:
/// - The account map's RwLock is held only to look up or insert an entry
///   Arc, never across an operation.
/// - Each account's Mutex serializes mutations on that account. It is
///   NEVER held across `TransferBackend::submit`: the local decrement
///   commits first, the lock is released, and a failed submit re-acquires
///   the lock to roll back. A reentrant call from inside the backend
///   therefore observes the already-decremented balance.
/// - Batch distribution acquires account locks in sorted address order,
///   which keeps concurrent batches deadlock-free.
/// - The totals Mutex is always acquired AFTER any account lock.
pub struct Ledger {
    accounts: RwLock<BTreeMap<Address, AccountEntry>>,
    roles: Roles,
    max_batch: usize,
    totals: Mutex<SupplyTotals>,
    backend: Arc<dyn TransferBackend>,
}

impl Ledger {
    /// Create a ledger with `initial_supply` grain credited to the owner.
    pub fn new(
        roles: Roles,
        initial_supply: u128,
        max_batch: usize,
        backend: Arc<dyn TransferBackend>,
    ) -> Self {
        let mut accounts = BTreeMap::new();
        accounts.insert(
            *roles.owner(),
            Arc::new(Mutex::new(AccountState {
                balance: initial_supply,
                pending: 0,
            })),
        );
        Ledger {
            accounts: RwLock::new(accounts),
            roles,
            max_batch,
            totals: Mutex::new(SupplyTotals {
                minted: initial_supply,
                paid_out: 0,
            }),
            backend,
        }
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    pub fn totals(&self) -> SupplyTotals {
        *safe_lock(&self.totals)
    }

    /// Entry lookup that auto-creates the account. Only credit operations
    /// (mint, queue_distribution) may call this; debit paths must use
    /// `existing_entry` so they cannot bloat state with empty accounts.
    fn entry_or_create(&self, addr: &Address) -> AccountEntry {
        if let Some(entry) = safe_read(&self.accounts).get(addr) {
            return entry.clone();
        }
        let mut accounts = safe_write(&self.accounts);
        accounts
            .entry(*addr)
            .or_insert_with(|| Arc::new(Mutex::new(AccountState::default())))
            .clone()
    }

    fn existing_entry(&self, addr: &Address) -> Option<AccountEntry> {
        safe_read(&self.accounts).get(addr).cloned()
    }

    /// Increase `to`'s balance by `amount`. Requires the minter capability,
    /// checked before any state access. Atomic: on any failure nothing is
    /// applied.
    pub fn mint(&self, caller: &Address, to: &Address, amount: u128) -> Result<(), LedgerError> {
        if !self.roles.is_minter(caller) {
            return Err(LedgerError::Unauthorized);
        }
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let entry = self.entry_or_create(to);
        let mut acct = safe_lock(&entry);

        // Validate both additions before committing either
        let new_balance = acct
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let mut totals = safe_lock(&self.totals);
        let new_minted = totals
            .minted
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        acct.balance = new_balance;
        totals.minted = new_minted;
        Ok(())
    }

    /// Debit `from` and pay the amount out through the backend.
    ///
    /// Checks-effects-interactions: the decrement commits under the
    /// account lock, the lock is released, THEN the external transfer
    /// runs. A nested withdraw for the same account triggered from inside
    /// the transfer sees the decremented balance, so the pre-decrement
    /// balance can never be spent twice. If the transfer is rejected or
    /// times out, the decrement is rolled back and the whole operation
    /// has no effect.
    pub fn withdraw(&self, from: &Address, amount: u128) -> Result<TxReceipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        // Debit paths never create accounts
        let entry = self
            .existing_entry(from)
            .ok_or(LedgerError::InsufficientBalance)?;

        {
            let mut acct = safe_lock(&entry);
            if acct.balance < amount {
                return Err(LedgerError::InsufficientBalance);
            }
            acct.balance -= amount;
        } // lock released before the external call

        match self.backend.submit(from, amount) {
            Ok(receipt) => {
                let mut totals = safe_lock(&self.totals);
                totals.paid_out = totals.paid_out.saturating_add(amount);
                Ok(receipt)
            }
            Err(e) => {
                // Rollback: restore exactly what was debited. saturating_add
                // cannot actually saturate here because the amount was just
                // subtracted from this same field.
                let mut acct = safe_lock(&entry);
                acct.balance = acct.balance.saturating_add(amount);
                Err(LedgerError::TransferFailed(e))
            }
        }
    }

    /// Queue `amount_each` grain for every recipient. Pure bookkeeping,
    /// no external transfer: the payout cost shifts to each recipient's
    /// own `claim` call, which is what bounds per-call work. Atomic
    /// across the batch: every recipient is updated or none is.
    pub fn queue_distribution(
        &self,
        caller: &Address,
        recipients: &[Address],
        amount_each: u128,
    ) -> Result<(), LedgerError> {
        if !self.roles.is_minter(caller) {
            return Err(LedgerError::Unauthorized);
        }
        if amount_each == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if recipients.len() > self.max_batch {
            return Err(LedgerError::BatchTooLarge {
                len: recipients.len(),
                max: self.max_batch,
            });
        }
        if recipients.is_empty() {
            return Ok(());
        }

        let mut sorted = recipients.to_vec();
        sorted.sort_unstable();
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return Err(LedgerError::DuplicateRecipient);
        }

        let total = amount_each
            .checked_mul(sorted.len() as u128)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        // Sorted-order lock acquisition; hold all recipient locks while
        // validating so a concurrent mutation cannot invalidate the batch
        // between the check and the apply.
        let entries: Vec<AccountEntry> = sorted.iter().map(|a| self.entry_or_create(a)).collect();
        let mut guards: Vec<MutexGuard<'_, AccountState>> =
            entries.iter().map(|e| safe_lock(e)).collect();

        let mut new_pending = Vec::with_capacity(guards.len());
        for guard in guards.iter() {
            new_pending.push(
                guard
                    .pending
                    .checked_add(amount_each)
                    .ok_or(LedgerError::ArithmeticOverflow)?,
            );
        }
        let mut totals = safe_lock(&self.totals);
        let new_minted = totals
            .minted
            .checked_add(total)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        for (guard, np) in guards.iter_mut().zip(new_pending) {
            guard.pending = np;
        }
        totals.minted = new_minted;
        Ok(())
    }

    /// Move the caller's full pending amount into an external transfer.
    /// Same ordering contract as `withdraw`: pending is zeroed before the
    /// transfer executes and restored if it fails.
    pub fn claim(&self, caller: &Address) -> Result<TxReceipt, LedgerError> {
        let entry = self
            .existing_entry(caller)
            .ok_or(LedgerError::NothingToClaim)?;

        let amount = {
            let mut acct = safe_lock(&entry);
            if acct.pending == 0 {
                return Err(LedgerError::NothingToClaim);
            }
            let amount = acct.pending;
            acct.pending = 0;
            amount
        };

        match self.backend.submit(caller, amount) {
            Ok(receipt) => {
                let mut totals = safe_lock(&self.totals);
                totals.paid_out = totals.paid_out.saturating_add(amount);
                Ok(receipt)
            }
            Err(e) => {
                let mut acct = safe_lock(&entry);
                acct.pending = acct.pending.saturating_add(amount);
                Err(LedgerError::TransferFailed(e))
            }
        }
    }

    /// Read-only balance query. Never creates accounts and never holds a
    /// lock across any external call; an absent account reads as zero.
    pub fn balance_of(&self, addr: &Address) -> u128 {
        match self.existing_entry(addr) {
            Some(entry) => safe_lock(&entry).balance,
            None => 0,
        }
    }

    pub fn pending_of(&self, addr: &Address) -> u128 {
        match self.existing_entry(addr) {
            Some(entry) => safe_lock(&entry).pending,
            None => 0,
        }
    }

    /// Consistent point-in-time copy of one account's state.
    pub fn account_snapshot(&self, addr: &Address) -> AccountState {
        match self.existing_entry(addr) {
            Some(entry) => *safe_lock(&entry),
            None => AccountState::default(),
        }
    }

    pub fn account_count(&self) -> usize {
        safe_read(&self.accounts).len()
    }

    /// Conservation invariant audit:
    ///
    ///   sum(balance) + sum(pending) + paid_out == minted
    ///
    /// Diagnostic tool for a quiescent ledger: account locks are taken one
    /// at a time, so a mutation in flight can show up as a transient delta.
    /// On a correctly functioning ledger at rest this always passes; a
    /// failure indicates a bug in a mutation or rollback path.
    pub fn audit_conservation(&self) -> Result<(), String> {
        let accounts = safe_read(&self.accounts);
        let mut balance_sum: u128 = 0;
        let mut pending_sum: u128 = 0;
        for entry in accounts.values() {
            let acct = safe_lock(entry);
            balance_sum = balance_sum.saturating_add(acct.balance);
            pending_sum = pending_sum.saturating_add(acct.pending);
        }
        drop(accounts);

        let totals = *safe_lock(&self.totals);
        let accounted = balance_sum
            .saturating_add(pending_sum)
            .saturating_add(totals.paid_out);

        if accounted == totals.minted {
            Ok(())
        } else if accounted > totals.minted {
            Err(format!(
                "conservation audit FAILED: accounted {} > minted {} (inflation of {} grain). \
                balances={}, pending={}, paid_out={}",
                accounted,
                totals.minted,
                accounted - totals.minted,
                balance_sum,
                pending_sum,
                totals.paid_out,
            ))
        } else {
            Err(format!(
                "conservation audit FAILED: accounted {} < minted {} (deflation of {} grain). \
                balances={}, pending={}, paid_out={}",
                accounted,
                totals.minted,
                totals.minted - accounted,
                balance_sum,
                pending_sum,
                totals.paid_out,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::OnceLock;

    fn addr(n: u8) -> Address {
        let mut b = [0u8; ADDRESS_BYTES];
        b[ADDRESS_BYTES - 1] = n;
        Address::from_bytes(b)
    }

    fn test_ledger(initial: u128) -> Ledger {
        let roles = Roles::new(addr(1), [addr(2)]);
        Ledger::new(roles, initial, 4, Arc::new(NullBackend::new()))
    }

    /// Backend that fails according to a script, for rollback testing.
    struct ScriptedBackend {
        // true = succeed, false = reject; empty script succeeds
        script: Mutex<VecDeque<bool>>,
    }

    impl ScriptedBackend {
        fn new(script: impl IntoIterator<Item = bool>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
            }
        }
    }

    impl TransferBackend for ScriptedBackend {
        fn submit(&self, _recipient: &Address, _amount: u128) -> Result<TxReceipt, SubmitError> {
            let ok = self.script.lock().unwrap().pop_front().unwrap_or(true);
            if ok {
                Ok(TxReceipt {
                    tx_id: "scripted".to_string(),
                })
            } else {
                Err(SubmitError::Rejected("scripted failure".to_string()))
            }
        }
    }

    #[test]
    fn test_mint_requires_capability() {
        let ledger = test_ledger(0);
        let outsider = addr(9);
        assert_eq!(
            ledger.mint(&outsider, &addr(5), 100),
            Err(LedgerError::Unauthorized)
        );
        assert_eq!(ledger.balance_of(&addr(5)), 0);

        // Owner and configured minter both hold the capability
        assert!(ledger.mint(&addr(1), &addr(5), 100).is_ok());
        assert!(ledger.mint(&addr(2), &addr(5), 50).is_ok());
        assert_eq!(ledger.balance_of(&addr(5)), 150);
        ledger.audit_conservation().unwrap();
    }

    #[test]
    fn test_mint_overflow_is_atomic() {
        let ledger = test_ledger(0);
        ledger.mint(&addr(1), &addr(5), u128::MAX).unwrap();
        assert_eq!(
            ledger.mint(&addr(1), &addr(5), 1),
            Err(LedgerError::ArithmeticOverflow)
        );
        assert_eq!(ledger.balance_of(&addr(5)), u128::MAX);
        ledger.audit_conservation().unwrap();
    }

    #[test]
    fn test_mint_zero_rejected() {
        let ledger = test_ledger(0);
        assert_eq!(
            ledger.mint(&addr(1), &addr(5), 0),
            Err(LedgerError::InvalidAmount)
        );
    }

    #[test]
    fn test_withdraw_insufficient_and_nonexistent() {
        let ledger = test_ledger(100);
        assert!(matches!(
            ledger.withdraw(&addr(1), 101),
            Err(LedgerError::InsufficientBalance)
        ));
        // Nonexistent account: insufficient, and NOT created
        assert!(matches!(
            ledger.withdraw(&addr(7), 1),
            Err(LedgerError::InsufficientBalance)
        ));
        assert_eq!(ledger.account_count(), 1);
    }

    #[test]
    fn test_withdraw_rollback_on_transfer_failure() {
        let roles = Roles::new(addr(1), []);
        let ledger = Ledger::new(
            roles,
            1000,
            4,
            Arc::new(ScriptedBackend::new([false, true])),
        );

        // First submit rejected: balance must be fully restored
        assert!(matches!(
            ledger.withdraw(&addr(1), 400),
            Err(LedgerError::TransferFailed(_))
        ));
        assert_eq!(ledger.balance_of(&addr(1)), 1000);
        ledger.audit_conservation().unwrap();

        // Second submit succeeds
        ledger.withdraw(&addr(1), 400).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 600);
        assert_eq!(ledger.totals().paid_out, 400);
        ledger.audit_conservation().unwrap();
    }

    /// Backend that calls back into `withdraw` for the same account from
    /// inside the transfer step. The nested call must observe the
    /// already-decremented balance (no double-spend).
    struct ReentrantBackend {
        ledger: OnceLock<Arc<Ledger>>,
        target: Address,
        reentered: AtomicBool,
        nested_result: Mutex<Option<Result<TxReceipt, LedgerError>>>,
    }

    impl TransferBackend for ReentrantBackend {
        fn submit(&self, _recipient: &Address, amount: u128) -> Result<TxReceipt, SubmitError> {
            if !self.reentered.swap(true, Ordering::SeqCst) {
                let ledger = self.ledger.get().expect("ledger wired");
                let nested = ledger.withdraw(&self.target, amount);
                *self.nested_result.lock().unwrap() = Some(nested);
            }
            Ok(TxReceipt {
                tx_id: "reentrant".to_string(),
            })
        }
    }

    #[test]
    fn test_reentrant_withdraw_sees_decremented_balance() {
        let target = addr(1);
        let backend = Arc::new(ReentrantBackend {
            ledger: OnceLock::new(),
            target,
            reentered: AtomicBool::new(false),
            nested_result: Mutex::new(None),
        });
        let ledger = Arc::new(Ledger::new(
            Roles::new(target, []),
            100,
            4,
            backend.clone(),
        ));
        backend.ledger.set(ledger.clone()).ok();

        // Outer withdraw of the full balance; the backend immediately
        // attempts to withdraw the same amount again.
        ledger.withdraw(&target, 100).unwrap();

        let nested = backend.nested_result.lock().unwrap().take();
        assert!(matches!(
            nested,
            Some(Err(LedgerError::InsufficientBalance))
        ));
        assert_eq!(ledger.balance_of(&target), 0);
        assert_eq!(ledger.totals().paid_out, 100);
        ledger.audit_conservation().unwrap();
    }

    #[test]
    fn test_distribution_batch_limit_leaves_pending_unchanged() {
        let ledger = test_ledger(0); // max_batch = 4
        let recipients: Vec<Address> = (10..15).map(addr).collect(); // 5 > 4
        assert_eq!(
            ledger.queue_distribution(&addr(1), &recipients, 10),
            Err(LedgerError::BatchTooLarge { len: 5, max: 4 })
        );
        for r in &recipients {
            assert_eq!(ledger.pending_of(r), 0);
        }
        ledger.audit_conservation().unwrap();
    }

    #[test]
    fn test_distribution_overflow_is_atomic_across_batch() {
        let ledger = test_ledger(0);
        // Pre-load one recipient near the limit so the second entry in the
        // batch overflows during validation
        ledger
            .queue_distribution(&addr(1), &[addr(11)], u128::MAX - 5)
            .unwrap();
        let batch = [addr(10), addr(11)];
        assert_eq!(
            ledger.queue_distribution(&addr(1), &batch, 10),
            Err(LedgerError::ArithmeticOverflow)
        );
        // Nothing applied, not even to the non-overflowing recipient
        assert_eq!(ledger.pending_of(&addr(10)), 0);
        assert_eq!(ledger.pending_of(&addr(11)), u128::MAX - 5);
    }

    #[test]
    fn test_distribution_rejects_duplicates_and_requires_minter() {
        let ledger = test_ledger(0);
        assert_eq!(
            ledger.queue_distribution(&addr(1), &[addr(10), addr(10)], 5),
            Err(LedgerError::DuplicateRecipient)
        );
        assert_eq!(
            ledger.queue_distribution(&addr(9), &[addr(10)], 5),
            Err(LedgerError::Unauthorized)
        );
        assert_eq!(ledger.pending_of(&addr(10)), 0);
    }

    #[test]
    fn test_claim_moves_pending_and_rejects_empty() {
        let ledger = test_ledger(0);
        assert_eq!(ledger.claim(&addr(10)), Err(LedgerError::NothingToClaim));

        ledger
            .queue_distribution(&addr(1), &[addr(10), addr(11)], 25)
            .unwrap();
        assert_eq!(ledger.pending_of(&addr(10)), 25);

        ledger.claim(&addr(10)).unwrap();
        assert_eq!(ledger.pending_of(&addr(10)), 0);
        assert_eq!(ledger.claim(&addr(10)), Err(LedgerError::NothingToClaim));
        assert_eq!(ledger.totals().paid_out, 25);
        ledger.audit_conservation().unwrap();
    }

    #[test]
    fn test_claim_rollback_restores_pending() {
        let roles = Roles::new(addr(1), []);
        let ledger = Ledger::new(roles, 0, 4, Arc::new(ScriptedBackend::new([false])));
        ledger.queue_distribution(&addr(1), &[addr(10)], 40).unwrap();

        assert!(matches!(
            ledger.claim(&addr(10)),
            Err(LedgerError::TransferFailed(_))
        ));
        assert_eq!(ledger.pending_of(&addr(10)), 40);
        ledger.audit_conservation().unwrap();
    }

    #[test]
    fn test_disjoint_accounts_mutate_concurrently() {
        let ledger = Arc::new(test_ledger(0));
        ledger.mint(&addr(1), &addr(10), 10_000).unwrap();
        ledger.mint(&addr(1), &addr(11), 10_000).unwrap();

        let mut handles = Vec::new();
        for target in [addr(10), addr(11)] {
            let l = ledger.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    l.withdraw(&target, 100).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ledger.balance_of(&addr(10)), 0);
        assert_eq!(ledger.balance_of(&addr(11)), 0);
        ledger.audit_conservation().unwrap();
    }
}
