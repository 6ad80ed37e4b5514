//! Fuzz target: balance request body handling
//!
//! Arbitrary bytes through the JSON body shape the gateway accepts.
//! Neither deserialization nor address parsing may panic.
//!
//! Run: cargo +nightly fuzz run fuzz_balance_request -- -max_len=4096

#![no_main]
use libfuzzer_sys::fuzz_target;
use serde::Deserialize;
use vaultgate_ledger::Address;

#[derive(Deserialize)]
struct BalanceRequest {
    address: String,
}

fuzz_target!(|data: &[u8]| {
    if let Ok(req) = serde_json::from_slice::<BalanceRequest>(data) {
        let _ = req.address.trim().parse::<Address>();
    }
});
