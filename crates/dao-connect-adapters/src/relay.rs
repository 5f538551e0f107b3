use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{address, Address, Bytes};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dao_connect_core::PortError;

use crate::eip1193::deterministic_signature;
use crate::rpc::error_object;
use crate::ConnectAdapterConfig;

pub const DETERMINISTIC_RELAY_ACCOUNT: Address =
    address!("2000000000000000000000000000000000000002");

/// Paired wallet session on the relay. The remote wallet resolves network
/// metadata itself, so no injection step is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySession {
    pub topic: String,
    pub accounts: Vec<Address>,
    pub chain_id: u64,
}

#[derive(Debug, Clone)]
pub struct RelayAdapter {
    mode: RelayMode,
    state: Arc<Mutex<RelayState>>,
}

#[derive(Debug, Clone)]
enum RelayMode {
    Disabled(String),
    Deterministic,
    Proxy(RelayRuntime),
}

#[derive(Debug, Clone)]
struct RelayRuntime {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Default)]
struct RelayState {
    session: Option<RelaySession>,
    pairings: u64,
}

impl Default for RelayAdapter {
    fn default() -> Self {
        Self::with_config(ConnectAdapterConfig::from_env())
    }
}

impl RelayAdapter {
    pub fn with_config(config: ConnectAdapterConfig) -> Self {
        let mode = match (&config.relay_proxy_url, config.http_client()) {
            (Some(url), Ok(client)) => RelayMode::Proxy(RelayRuntime {
                base_url: url.trim_end_matches('/').to_owned(),
                client,
            }),
            (Some(_), Err(e)) if config.strict_runtime_required() => RelayMode::Disabled(format!(
                "failed to initialize relay client in production profile: {e}"
            )),
            (None, _) if config.strict_runtime_required() => RelayMode::Disabled(
                "relay proxy URL not configured in production runtime profile".to_owned(),
            ),
            _ => RelayMode::Deterministic,
        };
        Self {
            mode,
            state: Arc::new(Mutex::new(RelayState::default())),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.mode, RelayMode::Disabled(_))
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let RelayMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, RelayState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("relay lock poisoned: {e}")))
    }

    fn topic(&self) -> Result<String, PortError> {
        self.lock()?
            .session
            .as_ref()
            .map(|s| s.topic.clone())
            .ok_or_else(|| PortError::NotFound("no relay session".to_owned()))
    }

    pub fn session(&self) -> Option<RelaySession> {
        self.state.lock().ok()?.session.clone()
    }

    pub fn selected_account(&self) -> Option<Address> {
        self.session()?.accounts.first().copied()
    }

    /// Waits until the remote wallet approves the pairing.
    pub async fn pair(&self) -> Result<RelaySession, PortError> {
        self.check_mode()?;
        let session = match &self.mode {
            RelayMode::Proxy(runtime) => {
                let body = runtime
                    .send(runtime.client.post(format!("{}/pair", runtime.base_url)))
                    .await?;
                serde_json::from_value::<RelaySession>(body)
                    .map_err(|e| PortError::Validation(format!("invalid relay session: {e}")))?
            }
            _ => {
                let n = self.lock()?.pairings + 1;
                RelaySession {
                    topic: format!("relay-topic-{n}"),
                    accounts: vec![DETERMINISTIC_RELAY_ACCOUNT],
                    chain_id: 1,
                }
            }
        };
        if session.accounts.is_empty() {
            return Err(PortError::Policy(
                "relay wallet approved without exposing an account".to_owned(),
            ));
        }
        let mut g = self.lock()?;
        g.pairings += 1;
        g.session = Some(session.clone());
        tracing::debug!(topic = %session.topic, "relay session paired");
        Ok(session)
    }

    pub async fn switch_chain(&self, chain_id: u64) -> Result<(), PortError> {
        self.check_mode()?;
        let topic = self.topic()?;
        if let RelayMode::Proxy(runtime) = &self.mode {
            runtime
                .send(
                    runtime
                        .client
                        .post(format!("{}/session/{topic}/chain", runtime.base_url))
                        .json(&serde_json::json!({ "chainId": chain_id })),
                )
                .await?;
        }
        if let Some(session) = self.lock()?.session.as_mut() {
            session.chain_id = chain_id;
        }
        Ok(())
    }

    pub async fn sign(&self, account: Address, message: &[u8]) -> Result<Bytes, PortError> {
        self.check_mode()?;
        let topic = self.topic()?;
        if let RelayMode::Proxy(runtime) = &self.mode {
            let body = runtime
                .send(
                    runtime
                        .client
                        .post(format!("{}/session/{topic}/sign", runtime.base_url))
                        .json(&serde_json::json!({
                            "account": account.to_string(),
                            "message": format!("0x{}", alloy::hex::encode(message)),
                        })),
                )
                .await?;
            let raw = body
                .get("signature")
                .and_then(Value::as_str)
                .ok_or_else(|| PortError::Transport("relay sign: signature missing".to_owned()))?;
            return raw
                .parse()
                .map_err(|e| PortError::Validation(format!("invalid signature hex: {e}")));
        }
        Ok(deterministic_signature(account, message))
    }

    /// Re-reads the session from the relay and returns its accounts.
    pub async fn refresh(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        let topic = self.topic()?;
        if let RelayMode::Proxy(runtime) = &self.mode {
            let body = runtime
                .send(
                    runtime
                        .client
                        .get(format!("{}/session/{topic}", runtime.base_url)),
                )
                .await?;
            let session = serde_json::from_value::<RelaySession>(body)
                .map_err(|e| PortError::Validation(format!("invalid relay session: {e}")))?;
            self.lock()?.session = Some(session);
        }
        Ok(self
            .session()
            .map(|s| s.accounts)
            .unwrap_or_default())
    }

    /// Drops the local session. The relay expires the pairing on its side.
    pub fn disconnect(&self) {
        if let Ok(mut g) = self.state.lock() {
            g.session = None;
        }
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        let mut g = self.lock()?;
        let session = g
            .session
            .as_mut()
            .ok_or_else(|| PortError::NotFound("no relay session".to_owned()))?;
        session.accounts = accounts;
        Ok(())
    }
}

impl RelayRuntime {
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, PortError> {
        let response = request
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("relay request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("relay json decode failed: {e}")))?;
        if let Some(err) = body.get("error") {
            return Err(error_object("relay", err));
        }
        if !status.is_success() {
            return Err(PortError::Transport(format!("relay status {status}: {body}")));
        }
        Ok(body)
    }
}
