// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROPERTY-BASED TESTS — vaultgate-ledger
//
// Verifies the conservation invariant over arbitrary operation sequences,
// including scripted backend failures that force the rollback paths.
// Run: cargo test -p vaultgate-ledger --test prop_ledger
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use vaultgate_ledger::{
    Address, Ledger, LedgerError, Roles, SubmitError, TransferBackend, TxReceipt, ADDRESS_BYTES,
};

const MAX_BATCH: usize = 8;

fn addr(n: u8) -> Address {
    let mut b = [0u8; ADDRESS_BYTES];
    b[ADDRESS_BYTES - 1] = n;
    Address::from_bytes(b)
}

/// Backend whose outcomes follow a pre-generated script (cycling).
/// The same script drives the reference model, so ledger and model agree
/// on which transfers fail.
struct ScriptedBackend {
    script: Vec<bool>,
    cursor: Mutex<usize>,
}

impl ScriptedBackend {
    fn new(script: Vec<bool>) -> Self {
        Self {
            script,
            cursor: Mutex::new(0),
        }
    }
}

impl TransferBackend for ScriptedBackend {
    fn submit(&self, _recipient: &Address, _amount: u128) -> Result<TxReceipt, SubmitError> {
        let mut cursor = self.cursor.lock().unwrap();
        let ok = if self.script.is_empty() {
            true
        } else {
            self.script[*cursor % self.script.len()]
        };
        *cursor += 1;
        if ok {
            Ok(TxReceipt {
                tx_id: format!("prop-{}", *cursor),
            })
        } else {
            Err(SubmitError::Rejected("scripted".to_string()))
        }
    }
}

#[derive(Debug, Clone)]
enum Op {
    Mint { to: u8, amount: u64 },
    Withdraw { from: u8, amount: u64 },
    Queue { recipients: Vec<u8>, amount: u32 },
    Claim { who: u8 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8, 1u64..=1_000_000).prop_map(|(to, amount)| Op::Mint { to, amount }),
        (0u8..8, 1u64..=1_000_000).prop_map(|(from, amount)| Op::Withdraw { from, amount }),
        (prop::collection::vec(0u8..8, 0..12), 1u32..=10_000)
            .prop_map(|(recipients, amount)| Op::Queue { recipients, amount }),
        (0u8..8).prop_map(|who| Op::Claim { who }),
    ]
}

/// Reference model mirroring the ledger's documented semantics.
#[derive(Default)]
struct Model {
    balances: HashMap<u8, u128>,
    pending: HashMap<u8, u128>,
    minted: u128,
    paid_out: u128,
    script: VecDeque<bool>,
    full_script: Vec<bool>,
}

impl Model {
    fn next_submit_ok(&mut self) -> bool {
        if self.full_script.is_empty() {
            return true;
        }
        if self.script.is_empty() {
            self.script = self.full_script.iter().copied().collect();
        }
        self.script.pop_front().unwrap_or(true)
    }
}

proptest! {
    /// PROPERTY: for every operation sequence, with transfers failing on an
    /// arbitrary schedule, the ledger matches a reference model and
    /// sum(balance) + sum(pending) never exceeds the total minted.
    #[test]
    fn prop_conservation_under_op_sequences(
        ops in prop::collection::vec(arb_op(), 1..60),
        script in prop::collection::vec(any::<bool>(), 0..10),
    ) {
        let owner = addr(0);
        let ledger = Ledger::new(
            Roles::new(owner, []),
            0,
            MAX_BATCH,
            Arc::new(ScriptedBackend::new(script.clone())),
        );

        let mut model = Model {
            script: script.iter().copied().collect(),
            full_script: script,
            ..Model::default()
        };

        for op in &ops {
            match op {
                Op::Mint { to, amount } => {
                    let amount = *amount as u128;
                    let res = ledger.mint(&owner, &addr(*to), amount);
                    prop_assert!(res.is_ok());
                    *model.balances.entry(*to).or_default() += amount;
                    model.minted += amount;
                }
                Op::Withdraw { from, amount } => {
                    let amount = *amount as u128;
                    let have = model.balances.get(from).copied().unwrap_or(0);
                    let res = ledger.withdraw(&addr(*from), amount);
                    if have < amount {
                        prop_assert_eq!(res, Err(LedgerError::InsufficientBalance));
                    } else if model.next_submit_ok() {
                        prop_assert!(res.is_ok());
                        *model.balances.get_mut(from).unwrap() -= amount;
                        model.paid_out += amount;
                    } else {
                        prop_assert!(matches!(res, Err(LedgerError::TransferFailed(_))));
                    }
                }
                Op::Queue { recipients, amount } => {
                    let amount = *amount as u128;
                    let addrs: Vec<Address> =
                        recipients.iter().map(|r| addr(*r)).collect();
                    let res = ledger.queue_distribution(&owner, &addrs, amount);
                    let mut uniq = recipients.clone();
                    uniq.sort_unstable();
                    let has_dup = uniq.windows(2).any(|w| w[0] == w[1]);
                    if recipients.len() > MAX_BATCH {
                        prop_assert_eq!(
                            res,
                            Err(LedgerError::BatchTooLarge {
                                len: recipients.len(),
                                max: MAX_BATCH
                            })
                        );
                    } else if has_dup {
                        prop_assert_eq!(res, Err(LedgerError::DuplicateRecipient));
                    } else {
                        prop_assert!(res.is_ok());
                        for r in recipients {
                            *model.pending.entry(*r).or_default() += amount;
                            model.minted += amount;
                        }
                    }
                }
                Op::Claim { who } => {
                    let have = model.pending.get(who).copied().unwrap_or(0);
                    let res = ledger.claim(&addr(*who));
                    if have == 0 {
                        prop_assert_eq!(res, Err(LedgerError::NothingToClaim));
                    } else if model.next_submit_ok() {
                        prop_assert!(res.is_ok());
                        model.pending.insert(*who, 0);
                        model.paid_out += have;
                    } else {
                        prop_assert!(matches!(res, Err(LedgerError::TransferFailed(_))));
                    }
                }
            }

            // Conservation must hold after EVERY operation, not just at the end
            prop_assert!(ledger.audit_conservation().is_ok());
        }

        // Ledger state matches the reference model exactly
        for n in 0u8..8 {
            prop_assert_eq!(
                ledger.balance_of(&addr(n)),
                model.balances.get(&n).copied().unwrap_or(0)
            );
            prop_assert_eq!(
                ledger.pending_of(&addr(n)),
                model.pending.get(&n).copied().unwrap_or(0)
            );
        }
        let totals = ledger.totals();
        prop_assert_eq!(totals.minted, model.minted);
        prop_assert_eq!(totals.paid_out, model.paid_out);

        // Held value can never exceed what was minted
        let held: u128 = (0u8..8)
            .map(|n| ledger.balance_of(&addr(n)) + ledger.pending_of(&addr(n)))
            .sum();
        prop_assert!(held <= totals.minted);
    }

    /// PROPERTY: address parsing never panics and valid forms round-trip.
    #[test]
    fn prop_address_parse_total(s in "\\PC*") {
        let _ = s.parse::<Address>();
    }

    #[test]
    fn prop_address_roundtrip(bytes in prop::array::uniform20(any::<u8>())) {
        let a = Address::from_bytes(bytes);
        let checksummed = a.to_checksum_string();
        let parsed: Address = checksummed.parse().expect("checksum form parses");
        prop_assert_eq!(parsed, a);

        let lower = format!("0x{}", hex::encode(bytes));
        let parsed_lower: Address = lower.parse().expect("lowercase form parses");
        prop_assert_eq!(parsed_lower, a);
    }
}
