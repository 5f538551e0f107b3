use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{address, keccak256, Address, Bytes};
use serde_json::Value;

use dao_connect_core::{NetworkConfig, PortError};

use crate::rpc::{address_list, hex_chain_id, json_chain_id, JsonRpcClient};
use crate::ConnectAdapterConfig;

/// Browser-extension wallet reached through an EIP-1193 JSON-RPC proxy.
#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic,
    Proxy(JsonRpcClient),
}

#[derive(Debug, Clone)]
struct ProviderState {
    accounts: Vec<Address>,
    chain_id: u64,
    added_chains: Vec<u64>,
    authorized: bool,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            accounts: vec![DETERMINISTIC_ACCOUNT],
            chain_id: 1,
            added_chains: vec![1],
            authorized: false,
        }
    }
}

pub const DETERMINISTIC_ACCOUNT: Address = address!("1000000000000000000000000000000000000001");

impl Default for Eip1193Adapter {
    fn default() -> Self {
        Self::with_config(ConnectAdapterConfig::from_env())
    }
}

impl Eip1193Adapter {
    pub fn with_config(config: ConnectAdapterConfig) -> Self {
        let mode = if let Some(ref url) = config.eip1193_proxy_url {
            match config.http_client() {
                Ok(client) => {
                    ProviderMode::Proxy(JsonRpcClient::new("eip1193 proxy", url.clone(), client))
                }
                Err(e) if config.strict_runtime_required() => ProviderMode::Disabled(format!(
                    "failed to initialize EIP-1193 proxy client in production profile: {e}"
                )),
                Err(e) => {
                    tracing::warn!(error = %e, "eip1193 proxy client unavailable, using deterministic wallet");
                    ProviderMode::Deterministic
                }
            }
        } else if config.strict_runtime_required() {
            ProviderMode::Disabled(
                "EIP-1193 proxy URL not configured in production runtime profile".to_owned(),
            )
        } else {
            ProviderMode::Deterministic
        };

        Self {
            mode,
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.mode, ProviderMode::Disabled(_))
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProviderState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))
    }

    /// Prompts the wallet for account access.
    pub async fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        let accounts = match &self.mode {
            ProviderMode::Proxy(rpc) => {
                let result = rpc
                    .call("eth_requestAccounts", serde_json::json!([]))
                    .await?;
                address_list(&result, "eth_requestAccounts")?
            }
            _ => self.lock()?.accounts.clone(),
        };
        if accounts.is_empty() {
            return Err(PortError::Policy(
                "no provider accounts available; unlock the wallet".to_owned(),
            ));
        }
        let mut g = self.lock()?;
        g.accounts = accounts.clone();
        g.authorized = true;
        Ok(accounts)
    }

    /// Accounts already exposed to this origin, without prompting.
    pub async fn accounts(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        if let ProviderMode::Proxy(rpc) = &self.mode {
            let result = rpc.call("eth_accounts", serde_json::json!([])).await?;
            let accounts = address_list(&result, "eth_accounts")?;
            self.lock()?.accounts = accounts;
        }
        let g = self.lock()?;
        Ok(if g.authorized { g.accounts.clone() } else { Vec::new() })
    }

    pub fn selected_account(&self) -> Option<Address> {
        let g = self.state.lock().ok()?;
        if !g.authorized {
            return None;
        }
        g.accounts.first().copied()
    }

    pub async fn chain_id(&self) -> Result<u64, PortError> {
        self.check_mode()?;
        if let ProviderMode::Proxy(rpc) = &self.mode {
            let result = rpc.call("eth_chainId", serde_json::json!([])).await?;
            let chain_id = json_chain_id(&result)?;
            self.lock()?.chain_id = chain_id;
            return Ok(chain_id);
        }
        Ok(self.lock()?.chain_id)
    }

    /// `wallet_switchEthereumChain`. A chain the wallet does not know counts
    /// as a rejection; metadata is only pushed by [`Self::add_chain`].
    pub async fn switch_chain(&self, chain_id: u64) -> Result<(), PortError> {
        self.check_mode()?;
        if let ProviderMode::Proxy(rpc) = &self.mode {
            rpc.call(
                "wallet_switchEthereumChain",
                serde_json::json!([{ "chainId": hex_chain_id(chain_id) }]),
            )
            .await
            .map_err(|e| match e {
                PortError::NotFound(m) => PortError::Rejected(m),
                other => other,
            })?;
        }
        self.lock()?.chain_id = chain_id;
        Ok(())
    }

    /// `wallet_addEthereumChain` followed by a switch to the added chain.
    pub async fn add_chain(&self, network: &NetworkConfig) -> Result<(), PortError> {
        self.check_mode()?;
        if network.rpc_urls.is_empty() {
            return Err(PortError::Validation(format!(
                "network {} has no rpc url to inject",
                network.name
            )));
        }
        if let ProviderMode::Proxy(rpc) = &self.mode {
            rpc.call(
                "wallet_addEthereumChain",
                serde_json::json!([add_chain_params(network)]),
            )
            .await?;
            rpc.call(
                "wallet_switchEthereumChain",
                serde_json::json!([{ "chainId": network.chain_id_hex() }]),
            )
            .await?;
        }
        let mut g = self.lock()?;
        if !g.added_chains.contains(&network.chain_id) {
            g.added_chains.push(network.chain_id);
        }
        g.chain_id = network.chain_id;
        Ok(())
    }

    pub async fn personal_sign(&self, account: Address, message: &[u8]) -> Result<Bytes, PortError> {
        self.check_mode()?;
        if let ProviderMode::Proxy(rpc) = &self.mode {
            let payload_hex = format!("0x{}", alloy::hex::encode(message));
            let result = rpc
                .call(
                    "personal_sign",
                    serde_json::json!([payload_hex, account.to_string()]),
                )
                .await?;
            let sig_raw = result.as_str().ok_or_else(|| {
                PortError::Transport("personal_sign must return hex string".to_owned())
            })?;
            return sig_raw
                .parse()
                .map_err(|e| PortError::Validation(format!("invalid signature hex: {e}")));
        }
        Ok(deterministic_signature(account, message))
    }

    /// Forgets the account grant. The extension keeps its own permission.
    pub fn disconnect(&self) {
        if let Ok(mut g) = self.state.lock() {
            g.authorized = false;
        }
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        self.lock()?.accounts = accounts;
        Ok(())
    }

    pub fn debug_inject_chain_changed(&self, chain_id: u64) -> Result<(), PortError> {
        self.lock()?.chain_id = chain_id;
        Ok(())
    }

    pub fn added_chains(&self) -> Vec<u64> {
        self.state
            .lock()
            .map(|g| g.added_chains.clone())
            .unwrap_or_default()
    }
}

fn add_chain_params(network: &NetworkConfig) -> Value {
    let mut params = serde_json::json!({
        "chainId": network.chain_id_hex(),
        "chainName": network.name,
        "rpcUrls": network.rpc_urls,
    });
    if !network.explorer_urls.is_empty() {
        params["blockExplorerUrls"] = serde_json::json!(network.explorer_urls);
    }
    if let Some(currency) = &network.native_currency {
        params["nativeCurrency"] = serde_json::json!({
            "name": currency.name,
            "symbol": currency.symbol,
            "decimals": currency.decimals,
        });
    }
    params
}

pub(crate) fn deterministic_signature(account: Address, message: &[u8]) -> Bytes {
    let mut seed = Vec::with_capacity(20 + message.len() + 13);
    seed.extend_from_slice(b"personal_sign");
    seed.extend_from_slice(account.as_slice());
    seed.extend_from_slice(message);
    let hash = keccak256(seed);
    let mut sig = Vec::with_capacity(65);
    sig.extend_from_slice(hash.as_slice());
    sig.extend_from_slice(hash.as_slice());
    sig.push(27);
    Bytes::from(sig)
}
