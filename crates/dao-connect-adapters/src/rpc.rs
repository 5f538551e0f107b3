use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::Address;
use serde_json::Value;

use dao_connect_core::domain::parse_chain_id;
use dao_connect_core::PortError;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED: i64 = 4001;
/// EIP-3326 "unrecognized chain id".
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

#[derive(Debug, Clone)]
pub(crate) struct JsonRpcClient {
    label: &'static str,
    url: String,
    client: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub(crate) fn new(label: &'static str, url: String, client: reqwest::Client) -> Self {
        Self {
            label,
            url,
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub(crate) async fn call(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(endpoint = self.label, method, id, "json-rpc call");
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("{} request failed: {e}", self.label)))?;
        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            PortError::Transport(format!("{} json decode failed: {e}", self.label))
        })?;
        if let Some(err) = body.get("error") {
            return Err(error_object(self.label, err));
        }
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "{} status {status}: {body}",
                self.label
            )));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport(format!("{} missing result", self.label)))
    }
}

/// Maps a provider error object onto the port taxonomy.
pub(crate) fn error_object(label: &str, err: &Value) -> PortError {
    let code = err.get("code").and_then(Value::as_i64);
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message");
    match code {
        Some(USER_REJECTED) => PortError::Rejected(message.to_owned()),
        Some(UNRECOGNIZED_CHAIN) => PortError::NotFound(format!("unrecognized chain: {message}")),
        _ => PortError::Transport(format!("{label} returned error: {err}")),
    }
}

pub(crate) fn address_list(value: &Value, method: &str) -> Result<Vec<Address>, PortError> {
    let arr = value
        .as_array()
        .ok_or_else(|| PortError::Transport(format!("{method}: array expected")))?;
    arr.iter()
        .map(|item| {
            let raw = item
                .as_str()
                .ok_or_else(|| PortError::Transport(format!("{method}: string expected")))?;
            raw.parse()
                .map_err(|e| PortError::Validation(format!("invalid account address: {e}")))
        })
        .collect()
}

pub(crate) fn json_chain_id(value: &Value) -> Result<u64, PortError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let raw = value
        .as_str()
        .ok_or_else(|| PortError::Validation("chain id must be string or number".to_owned()))?;
    parse_chain_id(raw).map_err(PortError::Validation)
}

pub(crate) fn hex_chain_id(chain_id: u64) -> String {
    format!("0x{chain_id:x}")
}
