// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - REQUEST PIPELINE
//
// Hard gates, in order: credential -> address format -> rate budget ->
// ledger read. A request that fails a gate never reaches the next one,
// and in particular never touches the ledger. Each request produces
// exactly one audit entry.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::audit;
use crate::metrics::GatewayMetrics;
use crate::rate_limiter::CredentialRateLimiter;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use vaultgate_ledger::{Address, Ledger};

/// Read-only view of the ledger. The trait seam exists so tests can count
/// calls and inject upstream faults; production wires the real `Ledger`.
pub trait BalanceSource: Send + Sync {
    /// Must not mutate any ledger state and must not acquire mutation
    /// locks beyond a point-in-time account snapshot.
    fn balance_of(&self, addr: &Address) -> Result<u128, String>;
}

impl BalanceSource for Ledger {
    fn balance_of(&self, addr: &Address) -> Result<u128, String> {
        Ok(Ledger::balance_of(self, addr))
    }
}

/// Request-terminal gateway failures, mapped 1:1 onto wire codes and HTTP
/// statuses. Messages are fixed strings: no internal detail ever crosses
/// into a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    Unauthorized,
    InvalidAddress,
    RateLimited { retry_secs: u64 },
    Internal,
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::InvalidAddress => "invalid_address",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::Internal => "internal_error",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::Unauthorized => 401,
            GatewayError::InvalidAddress => 400,
            GatewayError::RateLimited { .. } => 429,
            GatewayError::Internal => 500,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized => "missing or invalid credential",
            GatewayError::InvalidAddress => "address must be 0x followed by 40 hex chars",
            GatewayError::RateLimited { .. } => "request budget exhausted for this window",
            GatewayError::Internal => "internal error",
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for GatewayError {}

/// Wire body for POST /balance
#[derive(Deserialize)]
struct BalanceRequest {
    address: String,
}

/// Successful pipeline result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReply {
    pub address: Address,
    /// Stringified integer; u128 does not survive every JSON consumer
    pub balance: String,
}

pub struct Gateway {
    /// api key -> credential id
    keys: HashMap<String, String>,
    limiter: CredentialRateLimiter,
    source: Arc<dyn BalanceSource>,
    metrics: Arc<GatewayMetrics>,
}

impl Gateway {
    pub fn new(
        keys: HashMap<String, String>,
        limiter: CredentialRateLimiter,
        source: Arc<dyn BalanceSource>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Gateway {
            keys,
            limiter,
            source,
            metrics,
        }
    }

    /// Entry point for POST bodies. The credential gate runs BEFORE the
    /// body is parsed, so an unauthenticated caller cannot probe body
    /// validation; a malformed body then maps to `InvalidAddress`.
    pub fn handle_balance_body(
        &self,
        body: &[u8],
        credential: Option<&str>,
    ) -> Result<BalanceReply, GatewayError> {
        let timer = self.metrics.request_duration_seconds.start_timer();
        self.metrics.requests_total.inc();

        let credential_id = self.authenticate(credential, "<body>")?;

        let raw_address = match serde_json::from_slice::<BalanceRequest>(body) {
            Ok(req) => req.address,
            Err(e) => {
                self.metrics.invalid_address_total.inc();
                audit::record(
                    &credential_id,
                    &audit::echo(&String::from_utf8_lossy(body)),
                    "invalid_address",
                    Some(&e.to_string()),
                );
                return Err(GatewayError::InvalidAddress);
            }
        };

        let result = self.gated_query(&credential_id, &raw_address);
        timer.observe_duration();
        result
    }

    /// Entry point for path-parameter requests (GET /balance/:address).
    pub fn handle_balance_request(
        &self,
        raw_address: &str,
        credential: Option<&str>,
    ) -> Result<BalanceReply, GatewayError> {
        let timer = self.metrics.request_duration_seconds.start_timer();
        self.metrics.requests_total.inc();

        let credential_id = self.authenticate(credential, raw_address)?;
        let result = self.gated_query(&credential_id, raw_address);
        timer.observe_duration();
        result
    }

    /// Gate 1: credential lookup. On failure the ledger is never touched.
    fn authenticate(
        &self,
        credential: Option<&str>,
        raw_address: &str,
    ) -> Result<String, GatewayError> {
        match credential.and_then(|key| self.keys.get(key)) {
            Some(id) => Ok(id.clone()),
            None => {
                self.metrics.unauthorized_total.inc();
                audit::record(
                    audit::UNAUTHENTICATED,
                    &audit::echo(raw_address),
                    "unauthorized",
                    None,
                );
                Err(GatewayError::Unauthorized)
            }
        }
    }

    /// Gates 2-4: address format, rate budget, ledger read.
    fn gated_query(
        &self,
        credential_id: &str,
        raw_address: &str,
    ) -> Result<BalanceReply, GatewayError> {
        // Gate 2: exact-format address parse; no ledger access on failure
        let address = match raw_address.trim().parse::<Address>() {
            Ok(a) => a,
            Err(e) => {
                self.metrics.invalid_address_total.inc();
                audit::record(
                    credential_id,
                    &audit::echo(raw_address),
                    "invalid_address",
                    Some(&e.to_string()),
                );
                return Err(GatewayError::InvalidAddress);
            }
        };

        // Gate 3: per-credential fixed-window budget, before the read
        if let Err(retry_secs) = self.limiter.check_and_record(credential_id) {
            self.metrics.rate_limited_total.inc();
            audit::record(
                credential_id,
                &address.to_checksum_string(),
                "rate_limited",
                None,
            );
            return Err(GatewayError::RateLimited { retry_secs });
        }

        // Gate 4: the single read-only ledger query
        self.metrics.balance_queries_total.inc();
        match self.source.balance_of(&address) {
            Ok(balance) => {
                audit::record(credential_id, &address.to_checksum_string(), "ok", None);
                Ok(BalanceReply {
                    address,
                    balance: balance.to_string(),
                })
            }
            Err(detail) => {
                // Detail stays in the audit log; the caller gets the
                // generic code only
                self.metrics.internal_errors_total.inc();
                audit::record(
                    credential_id,
                    &address.to_checksum_string(),
                    "internal_error",
                    Some(&detail),
                );
                Err(GatewayError::Internal)
            }
        }
    }
}
