use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::state_machine::ConnectionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorKind {
    /// Injected browser-extension wallet (EIP-1193 provider).
    BrowserWallet,
    /// Wallet reached through a relay pairing protocol.
    RelayProtocol,
}

impl ConnectorKind {
    pub const ALL: [ConnectorKind; 2] = [ConnectorKind::BrowserWallet, ConnectorKind::RelayProtocol];

    pub fn label(self) -> &'static str {
        match self {
            ConnectorKind::BrowserWallet => "Browser wallet",
            ConnectorKind::RelayProtocol => "Wallet relay",
        }
    }
}

/// Opaque token handed out by the wallet bridge after a successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivationHandle(String);

impl ActivationHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorDescriptor {
    pub kind: ConnectorKind,
    pub activation_handle: Option<ActivationHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAddresses {
    pub organization_registry: Address,
    pub onboarding_registry: Address,
    pub identity_registry: Address,
    pub organization_type_registry: Address,
    pub plugin_registry: Address,
}

impl ContractAddresses {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Address)> {
        [
            ("organizationRegistry", self.organization_registry),
            ("onboardingRegistry", self.onboarding_registry),
            ("identityRegistry", self.identity_registry),
            ("organizationTypeRegistry", self.organization_type_registry),
            ("pluginRegistry", self.plugin_registry),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(deserialize_with = "chain_id_from_number_or_string")]
    pub chain_id: u64,
    #[serde(alias = "network")]
    pub name: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub explorer_urls: Vec<String>,
    pub native_currency: Option<NativeCurrency>,
    pub contracts: ContractAddresses,
}

impl NetworkConfig {
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    pub fn primary_rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }
}

fn chain_id_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => parse_chain_id(&s).map_err(serde::de::Error::custom),
    }
}

/// Parses a chain id given either as decimal or `0x`-prefixed hex.
pub fn parse_chain_id(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex chain id {raw}: {e}"))
    } else {
        raw.parse()
            .map_err(|e| format!("invalid chain id {raw}: {e}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerHandle {
    pub account: Address,
    pub connector: ConnectorKind,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub nonce: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub authorized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkInitRequest {
    pub signer: SignerHandle,
    pub organization_address: Address,
    pub chain_id: u64,
    pub rpc_url: Option<String>,
    pub contracts: ContractAddresses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSession {
    pub status: ConnectionStatus,
    pub account: Option<Address>,
    pub initial_account: Option<Address>,
    pub chain_id: Option<u64>,
    pub organization_address: Option<Address>,
    pub connector: Option<ConnectorKind>,
}

impl ConnectionSession {
    pub fn disconnected() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            account: None,
            initial_account: None,
            chain_id: None,
            organization_address: None,
            connector: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::disconnected()
    }
}

impl Default for ConnectionSession {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Why a connect attempt ended in rollback.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FailureReason {
    #[error("required parameters invalid: {0}")]
    ParameterInvalid(String),
    #[error("no network available: {0}")]
    NoNetworkAvailable(String),
    #[error("connector unavailable: {0}")]
    ConnectorUnavailable(String),
    #[error("network switch rejected: {0}")]
    NetworkSwitchRejected(String),
    #[error("provider network injection failed: {0}")]
    ProviderInjectionFailed(String),
    #[error("authorization transport error: {0}")]
    AuthorizationTransportError(String),
    #[error("account is not authorized")]
    NotAuthorized,
    #[error("backend initialization failed: {0}")]
    BackendInitFailed(String),
}

impl FailureReason {
    /// Environmental failures the user can retry by connecting again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureReason::ConnectorUnavailable(_)
                | FailureReason::NetworkSwitchRejected(_)
                | FailureReason::ProviderInjectionFailed(_)
                | FailureReason::AuthorizationTransportError(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::ParameterInvalid(_) => "PARAMETER_INVALID",
            FailureReason::NoNetworkAvailable(_) => "NO_NETWORK_AVAILABLE",
            FailureReason::ConnectorUnavailable(_) => "CONNECTOR_UNAVAILABLE",
            FailureReason::NetworkSwitchRejected(_) => "NETWORK_SWITCH_REJECTED",
            FailureReason::ProviderInjectionFailed(_) => "PROVIDER_INJECTION_FAILED",
            FailureReason::AuthorizationTransportError(_) => "AUTHORIZATION_TRANSPORT_ERROR",
            FailureReason::NotAuthorized => "NOT_AUTHORIZED",
            FailureReason::BackendInitFailed(_) => "BACKEND_INIT_FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionLogRecord {
    pub event_seq: u64,
    pub attempt: u64,
    pub action: String,
    pub state_before: String,
    pub state_after: String,
}
