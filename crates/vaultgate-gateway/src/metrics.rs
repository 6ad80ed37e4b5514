// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - METRICS MODULE
//
// Prometheus-compatible metrics for gateway monitoring, exposed via the
// /metrics endpoint.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

pub struct GatewayMetrics {
    registry: Registry,

    // Request pipeline outcomes
    pub requests_total: IntCounter,
    pub unauthorized_total: IntCounter,
    pub invalid_address_total: IntCounter,
    pub rate_limited_total: IntCounter,
    pub internal_errors_total: IntCounter,
    pub balance_queries_total: IntCounter,

    // Latency of the full pipeline, including the ledger read
    pub request_duration_seconds: Histogram,

    // Ledger-side gauges, refreshed by the health route
    pub ledger_accounts: IntGauge,
}

impl GatewayMetrics {
    pub fn new() -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let requests_total = IntCounter::with_opts(Opts::new(
            "vaultgate_requests_total",
            "Total balance requests received",
        ))?;
        registry.register(Box::new(requests_total.clone()))?;

        let unauthorized_total = IntCounter::with_opts(Opts::new(
            "vaultgate_unauthorized_total",
            "Requests rejected for a bad or missing credential",
        ))?;
        registry.register(Box::new(unauthorized_total.clone()))?;

        let invalid_address_total = IntCounter::with_opts(Opts::new(
            "vaultgate_invalid_address_total",
            "Requests rejected for a malformed address",
        ))?;
        registry.register(Box::new(invalid_address_total.clone()))?;

        let rate_limited_total = IntCounter::with_opts(Opts::new(
            "vaultgate_rate_limited_total",
            "Requests rejected by the per-credential rate limiter",
        ))?;
        registry.register(Box::new(rate_limited_total.clone()))?;

        let internal_errors_total = IntCounter::with_opts(Opts::new(
            "vaultgate_internal_errors_total",
            "Requests that failed on an internal/upstream fault",
        ))?;
        registry.register(Box::new(internal_errors_total.clone()))?;

        let balance_queries_total = IntCounter::with_opts(Opts::new(
            "vaultgate_balance_queries_total",
            "Ledger reads actually issued (requests that passed all gates)",
        ))?;
        registry.register(Box::new(balance_queries_total.clone()))?;

        let request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "vaultgate_request_duration_seconds",
            "Balance request pipeline duration",
        ))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let ledger_accounts = IntGauge::with_opts(Opts::new(
            "vaultgate_ledger_accounts",
            "Number of accounts known to the ledger",
        ))?;
        registry.register(Box::new(ledger_accounts.clone()))?;

        Ok(Arc::new(GatewayMetrics {
            registry,
            requests_total,
            unauthorized_total,
            invalid_address_total,
            rate_limited_total,
            internal_errors_total,
            balance_queries_total,
            request_duration_seconds,
            ledger_accounts,
        }))
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
