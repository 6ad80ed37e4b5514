// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - HTTP ROUTES
//
// Thin warp layer over the pipeline. Routes carry no policy of their own:
// authentication, address validation, and rate limiting all happen inside
// `Gateway`, so the two balance routes (POST body and GET path) cannot
// drift apart.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::metrics::GatewayMetrics;
use crate::pipeline::{BalanceReply, Gateway, GatewayError};
use bytes::Bytes;
use std::convert::Infallible;
use std::sync::Arc;
use vaultgate_ledger::Ledger;
use warp::Filter;

/// JSON reply whose HTTP status is taken from the body's `"code"` field,
/// defaulting to 200. Keeps status and body in one place at each call site.
fn api_json(body: serde_json::Value) -> warp::reply::WithStatus<warp::reply::Json> {
    let code = body
        .get("code")
        .and_then(|c| c.as_u64())
        .map(|c| c as u16)
        .unwrap_or(200);
    let status = warp::http::StatusCode::from_u16(code)
        .unwrap_or(warp::http::StatusCode::INTERNAL_SERVER_ERROR);
    warp::reply::with_status(warp::reply::json(&body), status)
}

fn reply_for(result: Result<BalanceReply, GatewayError>) -> warp::reply::WithStatus<warp::reply::Json> {
    match result {
        Ok(reply) => api_json(serde_json::json!({
            "address": reply.address.to_checksum_string(),
            "balance": reply.balance,
        })),
        Err(e) => {
            let mut body = serde_json::json!({
                "error": e.code(),
                "message": e.message(),
                "code": e.http_status(),
            });
            if let GatewayError::RateLimited { retry_secs } = e {
                body["retry_after_secs"] = serde_json::json!(retry_secs);
            }
            api_json(body)
        }
    }
}

fn with_gateway(
    gateway: Arc<Gateway>,
) -> impl Filter<Extract = (Arc<Gateway>,), Error = Infallible> + Clone {
    warp::any().map(move || gateway.clone())
}

fn with_ledger(
    ledger: Arc<Ledger>,
) -> impl Filter<Extract = (Arc<Ledger>,), Error = Infallible> + Clone {
    warp::any().map(move || ledger.clone())
}

pub fn routes(
    gateway: Arc<Gateway>,
    ledger: Arc<Ledger>,
    metrics: Arc<GatewayMetrics>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    // POST /balance  {"address": "0x..."}  with x-api-key header.
    // Body arrives as raw bytes so the credential gate runs before any
    // parsing of attacker-controlled content.
    let balance_post = warp::path!("balance")
        .and(warp::post())
        .and(warp::header::optional::<String>("x-api-key"))
        .and(warp::body::content_length_limit(4 * 1024))
        .and(warp::body::bytes())
        .and(with_gateway(gateway.clone()))
        .map(|key: Option<String>, body: Bytes, gw: Arc<Gateway>| {
            reply_for(gw.handle_balance_body(&body, key.as_deref()))
        });

    // GET /balance/0x...  convenience alias, same pipeline
    let balance_get = warp::path!("balance" / String)
        .and(warp::get())
        .and(warp::header::optional::<String>("x-api-key"))
        .and(with_gateway(gateway))
        .map(|address: String, key: Option<String>, gw: Arc<Gateway>| {
            reply_for(gw.handle_balance_request(&address, key.as_deref()))
        });

    // GET /health  unauthenticated liveness probe; also refreshes the
    // account gauge
    let metrics_for_health = metrics.clone();
    let health = warp::path!("health")
        .and(warp::get())
        .and(with_ledger(ledger))
        .map(move |ledger: Arc<Ledger>| {
            let accounts = ledger.account_count();
            metrics_for_health.ledger_accounts.set(accounts as i64);
            api_json(serde_json::json!({
                "status": "ok",
                "accounts": accounts,
                "conserved": ledger.audit_conservation().is_ok(),
            }))
        });

    // GET /metrics  Prometheus text exposition
    let metrics_route = warp::path!("metrics").and(warp::get()).map(move || {
        match metrics.export() {
            Ok(text) => warp::reply::with_status(
                warp::reply::with_header(text, "content-type", "text/plain; version=0.0.4"),
                warp::http::StatusCode::OK,
            ),
            Err(e) => {
                tracing::error!("metrics export failed: {}", e);
                warp::reply::with_status(
                    warp::reply::with_header(String::new(), "content-type", "text/plain"),
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                )
            }
        }
    });

    balance_post.or(balance_get).or(health).or(metrics_route)
}

/// Map warp rejections (unknown path, wrong method, oversized body) into
/// the same JSON error shape the pipeline uses.
pub async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, code, message) = if err.is_not_found() {
        (404, "not_found", "no such route")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (405, "method_not_allowed", "method not allowed for this route")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (400, "invalid_address", "request body too large")
    } else {
        tracing::error!("unhandled rejection: {:?}", err);
        (500, "internal_error", "internal error")
    };

    let json = warp::reply::json(&serde_json::json!({
        "error": code,
        "message": message,
        "code": status,
    }));
    Ok(warp::reply::with_status(
        json,
        warp::http::StatusCode::from_u16(status).unwrap_or(warp::http::StatusCode::INTERNAL_SERVER_ERROR),
    ))
}
