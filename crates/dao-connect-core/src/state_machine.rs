use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::FailureReason;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    SwitchingNetwork,
    InjectingProviderNetwork,
    Authorizing,
    InitializingBackend,
    Connected,
    Failed(FailureReason),
}

impl ConnectionStatus {
    /// A connect attempt owns the machine in these states.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connecting
                | ConnectionStatus::SwitchingNetwork
                | ConnectionStatus::InjectingProviderNetwork
                | ConnectionStatus::Authorizing
                | ConnectionStatus::InitializingBackend
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::SwitchingNetwork => "SwitchingNetwork",
            ConnectionStatus::InjectingProviderNetwork => "InjectingProviderNetwork",
            ConnectionStatus::Authorizing => "Authorizing",
            ConnectionStatus::InitializingBackend => "InitializingBackend",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Failed(_) => "Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    Connect,
    /// Resume from an already activated connector, skipping activation.
    ResumeWithConnector,
    ConnectorActivated,
    NetworkSwitched,
    ProviderNetworkReady,
    Authorized,
    BackendInitialized,
    StepFailed(FailureReason),
    RolledBack,
    Disconnect,
}

impl ConnectionAction {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionAction::Connect => "connect",
            ConnectionAction::ResumeWithConnector => "resume_with_connector",
            ConnectionAction::ConnectorActivated => "connector_activated",
            ConnectionAction::NetworkSwitched => "network_switched",
            ConnectionAction::ProviderNetworkReady => "provider_network_ready",
            ConnectionAction::Authorized => "authorized",
            ConnectionAction::BackendInitialized => "backend_initialized",
            ConnectionAction::StepFailed(_) => "step_failed",
            ConnectionAction::RolledBack => "rolled_back",
            ConnectionAction::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ConnectionStatus,
    pub to: ConnectionStatus,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("illegal connection transition: {from} --{action}-->")]
pub struct TransitionError {
    pub from: &'static str,
    pub action: &'static str,
}

pub fn connection_transition(
    from: &ConnectionStatus,
    action: ConnectionAction,
) -> Result<(ConnectionStatus, StateTransition), TransitionError> {
    use ConnectionAction as A;
    use ConnectionStatus as S;

    let reason = action.label();
    let to = match (from, action) {
        (_, A::Disconnect) => S::Disconnected,
        (S::Disconnected, A::Connect) => S::Connecting,
        (S::Disconnected, A::ResumeWithConnector) => S::SwitchingNetwork,
        (S::Connecting, A::ConnectorActivated) => S::SwitchingNetwork,
        (S::SwitchingNetwork, A::NetworkSwitched) => S::InjectingProviderNetwork,
        (S::InjectingProviderNetwork, A::ProviderNetworkReady) => S::Authorizing,
        (S::Authorizing, A::Authorized) => S::InitializingBackend,
        (S::InitializingBackend, A::BackendInitialized) => S::Connected,
        (s, A::StepFailed(failure)) if s.is_in_flight() => S::Failed(failure),
        (S::Failed(_), A::RolledBack) => S::Disconnected,
        (s, _) => {
            return Err(TransitionError {
                from: s.label(),
                action: reason,
            })
        }
    };

    Ok((
        to.clone(),
        StateTransition {
            from: from.clone(),
            to,
            reason,
        },
    ))
}
