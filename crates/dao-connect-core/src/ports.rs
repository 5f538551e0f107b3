#![allow(async_fn_in_trait)]

use alloy::primitives::{Address, Bytes};
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::{
    ActivationHandle, AuthorizationResult, Challenge, ConnectionSession, ConnectorKind,
    FailureReason, NetworkConfig, SdkInitRequest, SignerHandle,
};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rejected by user: {0}")]
    Rejected(String),
}

/// Host wallet bridge. Futures run on a single thread and may suspend
/// indefinitely while the user answers a wallet prompt.
pub trait WalletBridgePort {
    fn supports(&self, kind: ConnectorKind) -> bool;
    async fn activate(&self, kind: ConnectorKind) -> Result<ActivationHandle, PortError>;
    async fn switch_network(&self, chain_id: u64) -> Result<(), PortError>;
    fn requires_network_injection(&self, kind: ConnectorKind) -> bool;
    async fn inject_network(&self, network: &NetworkConfig) -> Result<(), PortError>;
    async fn signer(&self) -> Result<SignerHandle, PortError>;
    async fn sign_message(
        &self,
        signer: &SignerHandle,
        message: &[u8],
    ) -> Result<Bytes, PortError>;
    fn current_account(&self) -> Option<Address>;
    fn account_changes(&self) -> watch::Receiver<Option<Address>>;
    fn deactivate(&self);
}

pub trait AuthorizationPort {
    async fn challenge(&self, account: Address) -> Result<Challenge, PortError>;
    async fn verify(
        &self,
        account: Address,
        challenge: &Challenge,
        signature: &Bytes,
    ) -> Result<AuthorizationResult, PortError>;
}

pub trait BackendSdkPort {
    async fn init(&self, request: &SdkInitRequest) -> Result<(), PortError>;
}

/// Outbound signals to whatever renders the dashboard.
pub trait PresentationPort {
    fn on_connected(&self, session: &ConnectionSession);
    fn on_disconnected(&self);
    fn on_validation_failed(&self, reason: &str);
    fn on_connect_failed(&self, _reason: &FailureReason) {}
}
