// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - GATEWAY CONFIGURATION
//
// Loaded once at process start from a TOML file and immutable for the run:
// credential set, rate budgets, ledger role assignment, batch limit, and
// the optional payout endpoint.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use vaultgate_ledger::{Address, DEFAULT_MAX_BATCH};

/// Serde adapter for u128 <-> TOML: serialize as string, deserialize from
/// string or integer. The TOML crate does not natively support u128, so
/// amounts round-trip through strings.
mod u128_toml {
    use super::*;

    pub fn serialize<S: Serializer>(val: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&val.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        use serde::de::{self, Visitor};
        struct U128Visitor;

        impl<'de> Visitor<'de> for U128Visitor {
            type Value = u128;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a u128 as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
                Ok(v as u128)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
                if v >= 0 {
                    Ok(v as u128)
                } else {
                    Err(E::custom("negative value for u128"))
                }
            }
        }

        d.deserialize_any(U128Visitor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub gateway: GatewaySection,
    #[serde(default)]
    pub credentials: Vec<CredentialConfig>,
    pub ledger: LedgerSection,
    #[serde(default)]
    pub payout: PayoutSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySection {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub listen_port: u16,
    /// Fixed rate-limit window length
    #[serde(default = "default_window_secs")]
    pub rate_window_secs: u64,
    /// Requests allowed per credential per window, unless overridden
    #[serde(default = "default_budget")]
    pub rate_budget: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Stable identifier used in audit entries and rate-limit buckets.
    /// The key itself never appears in logs.
    pub id: String,
    pub key: String,
    /// Per-credential budget override
    pub budget: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSection {
    pub owner: String,
    #[serde(default)]
    pub minters: Vec<String>,
    /// Grain credited to the owner at ledger creation
    #[serde(with = "u128_toml", default)]
    pub initial_supply: u128,
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayoutSection {
    /// Settlement endpoint for withdraw/claim payouts. When absent the
    /// ledger runs with the always-succeeding null backend (dev mode).
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_window_secs() -> u64 {
    60
}

fn default_budget() -> u32 {
    60
}

fn default_max_batch() -> usize {
    DEFAULT_MAX_BATCH
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl GatewayConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: GatewayConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that TOML typing cannot express.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.owner_address()?;
        self.minter_addresses()?;

        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for cred in &self.credentials {
            if cred.id.is_empty() || cred.key.is_empty() {
                return Err("credential id and key must be non-empty".into());
            }
            if !ids.insert(cred.id.as_str()) {
                return Err(format!("duplicate credential id: {}", cred.id).into());
            }
            if !keys.insert(cred.key.as_str()) {
                return Err(format!("duplicate key for credential id: {}", cred.id).into());
            }
        }
        if self.gateway.rate_window_secs == 0 {
            return Err("rate_window_secs must be > 0".into());
        }
        if self.ledger.max_batch == 0 {
            return Err("max_batch must be > 0".into());
        }
        Ok(())
    }

    pub fn owner_address(&self) -> Result<Address, Box<dyn std::error::Error>> {
        Ok(self.ledger.owner.parse::<Address>()?)
    }

    pub fn minter_addresses(&self) -> Result<Vec<Address>, Box<dyn std::error::Error>> {
        let mut out = Vec::with_capacity(self.ledger.minters.len());
        for m in &self.ledger.minters {
            out.push(m.parse::<Address>()?);
        }
        Ok(out)
    }

    /// api key -> credential id
    pub fn key_map(&self) -> HashMap<String, String> {
        self.credentials
            .iter()
            .map(|c| (c.key.clone(), c.id.clone()))
            .collect()
    }

    /// credential id -> budget override
    pub fn budget_overrides(&self) -> HashMap<String, u32> {
        self.credentials
            .iter()
            .filter_map(|c| c.budget.map(|b| (c.id.clone(), b)))
            .collect()
    }
}
