// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - GATEWAY BINARY
//
// Wires config -> ledger -> pipeline -> HTTP server. Configuration comes
// from a TOML file named by VAULTGATE_CONFIG (default "vaultgate.toml").
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vaultgate_gateway::config::GatewayConfig;
use vaultgate_gateway::metrics::GatewayMetrics;
use vaultgate_gateway::pipeline::Gateway;
use vaultgate_gateway::rate_limiter::CredentialRateLimiter;
use vaultgate_gateway::rpc::RpcPayoutBackend;
use vaultgate_gateway::server;
use vaultgate_ledger::{Ledger, NullBackend, Roles, TransferBackend};
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("VAULTGATE_CONFIG").unwrap_or_else(|_| "vaultgate.toml".to_string());
    let config = GatewayConfig::load_from_file(Path::new(&config_path))?;

    let owner = config.owner_address()?;
    let minters = config.minter_addresses()?;

    let backend: Arc<dyn TransferBackend> = match &config.payout.endpoint {
        Some(endpoint) => {
            println!("💸 Payout backend: {}", endpoint);
            Arc::new(RpcPayoutBackend::new(
                endpoint.clone(),
                Duration::from_millis(config.payout.timeout_ms),
            )?)
        }
        None => {
            println!("💸 Payout backend: null (dev mode, transfers always settle)");
            Arc::new(NullBackend::new())
        }
    };

    let ledger = Arc::new(Ledger::new(
        Roles::new(owner, minters),
        config.ledger.initial_supply,
        config.ledger.max_batch,
        backend,
    ));

    let metrics = GatewayMetrics::new()?;
    let limiter = CredentialRateLimiter::new(
        Duration::from_secs(config.gateway.rate_window_secs),
        config.gateway.rate_budget,
        config.budget_overrides(),
    );
    let gateway = Arc::new(Gateway::new(
        config.key_map(),
        limiter,
        ledger.clone(),
        metrics.clone(),
    ));

    let addr: IpAddr = config.gateway.listen_addr.parse()?;
    let port = config.gateway.listen_port;

    println!("🏦 VaultGate starting");
    println!("   Owner:       {}", owner.to_checksum_string());
    println!("   Credentials: {}", config.credentials.len());
    println!(
        "   Rate limit:  {} requests / {}s per credential",
        config.gateway.rate_budget, config.gateway.rate_window_secs
    );
    println!("   Listening:   http://{}:{}", addr, port);

    let routes = server::routes(gateway, ledger, metrics).recover(server::handle_rejection);
    warp::serve(routes).run((addr, port)).await;

    Ok(())
}
