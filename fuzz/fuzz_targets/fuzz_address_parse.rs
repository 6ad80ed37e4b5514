//! Fuzz target: account address parsing
//!
//! Feeds arbitrary strings to Address::from_str to ensure:
//! 1. No panics on any input
//! 2. Accepted addresses round-trip through their checksum form
//!
//! Run: cargo +nightly fuzz run fuzz_address_parse -- -max_len=256

#![no_main]
use libfuzzer_sys::fuzz_target;
use vaultgate_ledger::Address;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Parsing must never panic, even on garbage input
        if let Ok(addr) = s.parse::<Address>() {
            // Anything accepted must re-parse from its canonical form
            let canonical = addr.to_checksum_string();
            let reparsed = canonical
                .parse::<Address>()
                .expect("canonical form must parse");
            assert_eq!(addr, reparsed, "checksum round-trip mismatch");
        }
    }
});
