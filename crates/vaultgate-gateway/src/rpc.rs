// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - SETTLEMENT RPC BACKEND
//
// TransferBackend implementation that submits payouts to an external
// settlement endpoint over HTTP. Used for withdraw and claim; balance
// reads never go through here.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::Deserialize;
use std::time::Duration;
use vaultgate_ledger::{Address, SubmitError, TransferBackend, TxReceipt};

#[derive(Deserialize)]
struct TransferResponse {
    success: bool,
    tx_id: Option<String>,
    error: Option<String>,
}

pub struct RpcPayoutBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl RpcPayoutBackend {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to build payout client: {}", e))?;
        Ok(RpcPayoutBackend { client, endpoint })
    }

    fn transfer_payload(recipient: &Address, amount: u128) -> serde_json::Value {
        serde_json::json!({
            "method": "transfer",
            "params": {
                "recipient": recipient.to_checksum_string(),
                // stringified so the peer never has to handle u128 JSON
                "amount": amount.to_string(),
            }
        })
    }
}

impl TransferBackend for RpcPayoutBackend {
    fn submit(&self, recipient: &Address, amount: u128) -> Result<TxReceipt, SubmitError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&Self::transfer_payload(recipient, amount))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    SubmitError::Timeout
                } else {
                    SubmitError::Rejected(format!("transport error: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::Rejected(format!(
                "settlement endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: TransferResponse = response
            .json()
            .map_err(|e| SubmitError::Rejected(format!("malformed settlement response: {}", e)))?;

        if !body.success {
            return Err(SubmitError::Rejected(
                body.error
                    .unwrap_or_else(|| "settlement rejected transfer".to_string()),
            ));
        }

        Ok(TxReceipt {
            tx_id: body
                .tx_id
                .unwrap_or_else(|| "settled-without-id".to_string()),
        })
    }
}
