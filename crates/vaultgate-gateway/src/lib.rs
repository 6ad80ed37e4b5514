// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - GATEWAY
//
// Front door for the ledger: turns an untrusted HTTP request into a single
// validated, authenticated, rate-limited read-only balance query.
// Pipeline gates, in order: credential -> address format -> rate budget ->
// ledger read. Every request leaves one audit log entry.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod audit;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod rate_limiter;
pub mod rpc;
pub mod server;

pub use config::GatewayConfig;
pub use metrics::GatewayMetrics;
pub use pipeline::{BalanceSource, Gateway, GatewayError};
pub use rate_limiter::CredentialRateLimiter;
pub use rpc::RpcPayoutBackend;
