use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{keccak256, Address, Bytes};
use reqwest::StatusCode;

use dao_connect_core::domain::{AuthorizationResult, Challenge};
use dao_connect_core::{AuthorizationPort, PortError};

use crate::ConnectAdapterConfig;

/// Challenge/verify client for the backend authorization service.
#[derive(Debug, Clone)]
pub struct AuthServiceAdapter {
    mode: AuthMode,
    state: Arc<Mutex<AuthState>>,
}

#[derive(Debug, Clone)]
enum AuthMode {
    Disabled(String),
    Deterministic,
    Http(AuthRuntime),
}

#[derive(Debug, Clone)]
struct AuthRuntime {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Default)]
struct AuthState {
    issued: u64,
    denied: Vec<Address>,
}

impl Default for AuthServiceAdapter {
    fn default() -> Self {
        Self::with_config(ConnectAdapterConfig::from_env())
    }
}

impl AuthServiceAdapter {
    pub fn with_config(config: ConnectAdapterConfig) -> Self {
        let mode = match (&config.auth_base_url, config.http_client()) {
            (Some(url), Ok(client)) => AuthMode::Http(AuthRuntime {
                base_url: url.trim_end_matches('/').to_owned(),
                client,
            }),
            (Some(_), Err(e)) if config.strict_runtime_required() => AuthMode::Disabled(format!(
                "failed to initialize auth client in production profile: {e}"
            )),
            (None, _) if config.strict_runtime_required() => AuthMode::Disabled(
                "auth service URL not configured in production runtime profile".to_owned(),
            ),
            _ => AuthMode::Deterministic,
        };
        Self {
            mode,
            state: Arc::new(Mutex::new(AuthState::default())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, AuthState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("auth lock poisoned: {e}")))
    }

    /// Deterministic mode only: make `account` fail verification.
    pub fn debug_deny(&self, account: Address) -> Result<(), PortError> {
        self.lock()?.denied.push(account);
        Ok(())
    }
}

fn challenge_message(account: Address, nonce: &str) -> String {
    format!("Sign this message to prove you control {account}.\n\nNonce: {nonce}")
}

impl AuthorizationPort for AuthServiceAdapter {
    async fn challenge(&self, account: Address) -> Result<Challenge, PortError> {
        match &self.mode {
            AuthMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            AuthMode::Http(runtime) => {
                let url = format!("{}/auth/challenge/{account}", runtime.base_url);
                tracing::debug!(%url, "requesting auth challenge");
                let response = runtime
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| PortError::Transport(format!("auth challenge failed: {e}")))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(PortError::Transport(format!(
                        "auth challenge status {status}"
                    )));
                }
                response.json::<Challenge>().await.map_err(|e| {
                    PortError::Transport(format!("auth challenge decode failed: {e}"))
                })
            }
            AuthMode::Deterministic => {
                let mut g = self.lock()?;
                g.issued += 1;
                let mut seed = account.to_vec();
                seed.extend_from_slice(&g.issued.to_be_bytes());
                let nonce = keccak256(seed).to_string();
                Ok(Challenge {
                    message: challenge_message(account, &nonce),
                    nonce,
                })
            }
        }
    }

    async fn verify(
        &self,
        account: Address,
        challenge: &Challenge,
        signature: &Bytes,
    ) -> Result<AuthorizationResult, PortError> {
        match &self.mode {
            AuthMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            AuthMode::Http(runtime) => {
                let response = runtime
                    .client
                    .post(format!("{}/auth/verify", runtime.base_url))
                    .json(&serde_json::json!({
                        "address": account.to_string(),
                        "nonce": challenge.nonce,
                        "signature": signature.to_string(),
                    }))
                    .send()
                    .await
                    .map_err(|e| PortError::Transport(format!("auth verify failed: {e}")))?;
                match response.status() {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        Ok(AuthorizationResult { authorized: false })
                    }
                    status if status.is_success() => {
                        response.json::<AuthorizationResult>().await.map_err(|e| {
                            PortError::Transport(format!("auth verify decode failed: {e}"))
                        })
                    }
                    status => Err(PortError::Transport(format!("auth verify status {status}"))),
                }
            }
            AuthMode::Deterministic => {
                if signature.len() != 65 {
                    return Err(PortError::Validation(format!(
                        "signature must be 65 bytes, got {}",
                        signature.len()
                    )));
                }
                let denied = self.lock()?.denied.contains(&account);
                Ok(AuthorizationResult {
                    authorized: !denied && challenge.message.contains(&account.to_string()),
                })
            }
        }
    }
}
