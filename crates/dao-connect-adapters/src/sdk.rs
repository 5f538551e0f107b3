use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use serde_json::Value;

use dao_connect_core::domain::ContractAddresses;
use dao_connect_core::{BackendSdkPort, ConnectorKind, PortError, SdkInitRequest};

use crate::rpc::{json_chain_id, JsonRpcClient};
use crate::ConnectAdapterConfig;

/// What the dashboard's contract layer is bound to after a successful
/// handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkBinding {
    pub account: Address,
    pub connector: ConnectorKind,
    pub organization_address: Address,
    pub chain_id: u64,
    pub rpc_url: Option<String>,
    pub contracts: ContractAddresses,
}

#[derive(Debug, Clone)]
pub struct BackendSdkAdapter {
    config: ConnectAdapterConfig,
    binding: Arc<Mutex<Option<SdkBinding>>>,
}

impl Default for BackendSdkAdapter {
    fn default() -> Self {
        Self::with_config(ConnectAdapterConfig::from_env())
    }
}

impl BackendSdkAdapter {
    pub fn with_config(config: ConnectAdapterConfig) -> Self {
        Self {
            config,
            binding: Arc::new(Mutex::new(None)),
        }
    }

    pub fn binding(&self) -> Option<SdkBinding> {
        self.binding.lock().ok()?.clone()
    }

    pub fn reset(&self) {
        if let Ok(mut g) = self.binding.lock() {
            *g = None;
        }
    }

    async fn verify_chain(&self, request: &SdkInitRequest) -> Result<(), PortError> {
        let url = request.rpc_url.clone().ok_or_else(|| {
            PortError::Validation(format!("chain {} has no rpc url", request.chain_id))
        })?;
        let client = self
            .config
            .http_client()
            .map_err(|e| PortError::Transport(format!("rpc client init failed: {e}")))?;
        let rpc = JsonRpcClient::new("chain rpc", url, client);

        let reported = json_chain_id(&rpc.call("eth_chainId", serde_json::json!([])).await?)?;
        if reported != request.chain_id {
            return Err(PortError::Validation(format!(
                "rpc serves chain {reported}, expected {}",
                request.chain_id
            )));
        }

        for (name, address) in request.contracts.iter() {
            let code = rpc
                .call(
                    "eth_getCode",
                    serde_json::json!([address.to_string(), "latest"]),
                )
                .await?;
            let empty = match code.as_str() {
                Some(hex) => hex.trim_start_matches("0x").is_empty(),
                None => code == Value::Null,
            };
            if empty {
                return Err(PortError::NotFound(format!("{name} has no code at {address}")));
            }
        }
        Ok(())
    }
}

impl BackendSdkPort for BackendSdkAdapter {
    async fn init(&self, request: &SdkInitRequest) -> Result<(), PortError> {
        if request.organization_address == Address::ZERO {
            return Err(PortError::Validation(
                "organization address must not be zero".to_owned(),
            ));
        }
        if request.signer.chain_id != request.chain_id {
            return Err(PortError::Validation(format!(
                "signer is on chain {}, sdk requested for {}",
                request.signer.chain_id, request.chain_id
            )));
        }
        if self.config.rpc_check {
            self.verify_chain(request).await?;
        }

        let binding = SdkBinding {
            account: request.signer.account,
            connector: request.signer.connector,
            organization_address: request.organization_address,
            chain_id: request.chain_id,
            rpc_url: request.rpc_url.clone(),
            contracts: request.contracts.clone(),
        };
        let mut g = self
            .binding
            .lock()
            .map_err(|e| PortError::Transport(format!("sdk lock poisoned: {e}")))?;
        *g = Some(binding);
        tracing::info!(
            organization = %request.organization_address,
            chain_id = request.chain_id,
            "backend sdk initialized"
        );
        Ok(())
    }
}
