use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy::primitives::Address;
use tokio::sync::{mpsc, watch};

use crate::catalog::NetworkCatalog;
use crate::domain::{
    ConnectionSession, ConnectorDescriptor, ConnectorKind, FailureReason, NetworkConfig,
    SdkInitRequest, TransitionLogRecord,
};
use crate::params::{RequiredParameterValidator, RequiredParameters, ValidationOutcome};
use crate::ports::{AuthorizationPort, BackendSdkPort, PresentationPort, WalletBridgePort};
use crate::registry::ConnectorRegistry;
use crate::session::SessionStore;
use crate::state_machine::{
    connection_transition, ConnectionAction, ConnectionStatus, StateTransition, TransitionError,
};
use crate::watchdog::{AccountWatchdog, DriftNotice};

#[derive(Debug, Clone)]
pub enum ConnectionCommand {
    Connect {
        params: RequiredParameters,
        connector: ConnectorKind,
        chain_id: Option<u64>,
    },
    SelectConnector {
        connector: ConnectorKind,
        chain_id: Option<u64>,
    },
    EagerReconnect {
        params: RequiredParameters,
    },
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    AttemptInFlight,
    AlreadyConnected,
    NoActiveConnector,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Connected(ConnectionSession),
    ConnectorSelected(ConnectorDescriptor),
    Disconnected,
    Failed(FailureReason),
    Rejected(RejectReason),
    /// A disconnect overtook the attempt; it ended without publishing.
    Superseded,
}

enum Abort {
    Superseded,
    Failed(FailureReason),
}

struct CoordinatorState {
    status: ConnectionStatus,
    generation: u64,
    /// A connector prompt from [`ConnectionCoordinator::select_connector`] is open.
    selecting: bool,
    eager_intent: bool,
    last_network: Option<NetworkConfig>,
    last_failure: Option<FailureReason>,
    event_seq: u64,
    log: Vec<TransitionLogRecord>,
}

/// Owns the connection lifecycle for one dashboard load.
///
/// All entry points take `&self`; the state lock is never held across an
/// await, so the watchdog and an in-flight connect can share one thread.
pub struct ConnectionCoordinator<W, A, B, P>
where
    W: WalletBridgePort,
    A: AuthorizationPort,
    B: BackendSdkPort,
    P: PresentationPort,
{
    pub wallet: W,
    pub authorization: A,
    pub backend: B,
    pub presentation: P,
    pub registry: ConnectorRegistry,
    pub catalog: NetworkCatalog,
    sessions: SessionStore,
    inner: Mutex<CoordinatorState>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl<W, A, B, P> ConnectionCoordinator<W, A, B, P>
where
    W: WalletBridgePort,
    A: AuthorizationPort,
    B: BackendSdkPort,
    P: PresentationPort,
{
    pub fn new(
        wallet: W,
        authorization: A,
        backend: B,
        presentation: P,
        catalog: NetworkCatalog,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            wallet,
            authorization,
            backend,
            presentation,
            registry: ConnectorRegistry::new(),
            catalog,
            sessions: SessionStore::default(),
            inner: Mutex::new(CoordinatorState {
                status: ConnectionStatus::Disconnected,
                generation: 0,
                selecting: false,
                eager_intent: false,
                last_network: None,
                last_failure: None,
                event_seq: 0,
                log: Vec::new(),
            }),
            status_tx,
        }
    }

    pub async fn handle(&self, command: ConnectionCommand) -> CommandOutcome {
        match command {
            ConnectionCommand::Connect {
                params,
                connector,
                chain_id,
            } => self.connect(&params, connector, chain_id).await,
            ConnectionCommand::SelectConnector {
                connector,
                chain_id,
            } => self.select_connector(connector, chain_id).await,
            ConnectionCommand::EagerReconnect { params } => self.eager_reconnect(&params).await,
            ConnectionCommand::Disconnect => self.disconnect(),
        }
    }

    /// Validates a deep-link query and reports a missing field to the shim.
    pub fn validate_request(&self, query: &str) -> ValidationOutcome {
        let outcome = RequiredParameterValidator::validate(query);
        if let ValidationOutcome::Missing(reason) = &outcome {
            tracing::info!(reason = %reason, "deep link rejected");
            self.presentation.on_validation_failed(reason);
        }
        outcome
    }

    pub fn available_connectors(&self) -> Vec<ConnectorKind> {
        self.registry.available(&self.wallet)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state().status.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    pub fn sessions(&self) -> SessionStore {
        self.sessions.clone()
    }

    pub fn last_failure(&self) -> Option<FailureReason> {
        self.state().last_failure.clone()
    }

    pub fn transition_log(&self) -> Vec<TransitionLogRecord> {
        self.state().log.clone()
    }

    pub async fn connect(
        &self,
        params: &RequiredParameters,
        connector: ConnectorKind,
        chain_id: Option<u64>,
    ) -> CommandOutcome {
        let attempt = match self.begin() {
            Ok(attempt) => attempt,
            Err(reject) => return CommandOutcome::Rejected(reject),
        };
        tracing::info!(attempt, connector = connector.label(), "connect attempt started");
        let result = self.run_connect(attempt, params, connector, chain_id).await;
        self.conclude(attempt, result)
    }

    /// Activates a connector without running the handshake and remembers it
    /// for [`Self::eager_reconnect`].
    ///
    /// Other attempts are refused until the wallet answers the prompt, even
    /// across a disconnect.
    pub async fn select_connector(
        &self,
        connector: ConnectorKind,
        chain_id: Option<u64>,
    ) -> CommandOutcome {
        let generation = {
            let mut state = self.state();
            if let Some(reject) = busy(&state) {
                return CommandOutcome::Rejected(reject);
            }
            state.selecting = true;
            state.generation
        };

        let network = match self.catalog.resolve(chain_id) {
            Ok(network) => network,
            Err(e) => {
                return self.reject_selection(FailureReason::NoNetworkAvailable(e.to_string()))
            }
        };
        let descriptor = match self.registry.activate(&self.wallet, connector).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                return self.reject_selection(FailureReason::ConnectorUnavailable(e.to_string()))
            }
        };

        let mut state = self.state();
        state.selecting = false;
        if state.generation != generation || busy(&state).is_some() {
            drop(state);
            if let Some(handle) = &descriptor.activation_handle {
                self.registry.release(&self.wallet, handle);
            }
            return CommandOutcome::Superseded;
        }
        state.eager_intent = true;
        state.last_network = Some(network);
        tracing::info!(connector = connector.label(), "connector selected");
        CommandOutcome::ConnectorSelected(descriptor)
    }

    /// Resumes the handshake from the already active connector without
    /// prompting for a connector again.
    pub async fn eager_reconnect(&self, params: &RequiredParameters) -> CommandOutcome {
        let (attempt, connector, network) = {
            let mut state = self.state();
            if let Some(reject) = busy(&state) {
                return CommandOutcome::Rejected(reject);
            }
            let active = self.registry.active().filter(|d| d.activation_handle.is_some());
            let (Some(descriptor), Some(network), true) =
                (active, state.last_network.clone(), state.eager_intent)
            else {
                return CommandOutcome::Rejected(RejectReason::NoActiveConnector);
            };
            state.generation += 1;
            if let Err(e) = self.apply(&mut state, ConnectionAction::ResumeWithConnector) {
                tracing::error!(error = %e, "eager reconnect refused");
                return CommandOutcome::Rejected(RejectReason::AttemptInFlight);
            }
            (state.generation, descriptor.kind, network)
        };
        tracing::info!(attempt, connector = connector.label(), "eager reconnect started");
        let result = self.handshake(attempt, params, network, connector).await;
        self.conclude(attempt, result)
    }

    /// Tears everything down from any state. Safe to call repeatedly.
    pub fn disconnect(&self) -> CommandOutcome {
        let changed = {
            let mut state = self.state();
            state.generation += 1;
            self.registry.deactivate(&self.wallet);
            self.sessions.clear();
            state.eager_intent = false;
            let changed = state.status != ConnectionStatus::Disconnected;
            if changed {
                if let Err(e) = self.apply(&mut state, ConnectionAction::Disconnect) {
                    tracing::error!(error = %e, "disconnect transition refused");
                }
            }
            changed
        };
        if changed {
            tracing::info!("disconnected");
            self.presentation.on_disconnected();
        }
        CommandOutcome::Disconnected
    }

    /// Disconnects on drift, as long as the notice still describes the live
    /// session. Returns when the watchdog side of the channel closes.
    pub async fn supervise(&self, mut drift_rx: mpsc::Receiver<DriftNotice>) {
        while let Some(notice) = drift_rx.recv().await {
            let live = self.state().status == ConnectionStatus::Connected
                && self.sessions.current().initial_account == Some(notice.expected);
            if live {
                tracing::warn!(
                    expected = %notice.expected,
                    observed = %notice.observed,
                    "account drift, disconnecting"
                );
                self.disconnect();
            }
        }
    }

    /// Watches the wallet's account feed for the rest of the load.
    pub async fn run_account_watchdog(&self) {
        let (drift_tx, drift_rx) = mpsc::channel(8);
        let watchdog =
            AccountWatchdog::new(self.wallet.account_changes(), self.sessions.subscribe(), drift_tx);
        tokio::join!(watchdog.run(), self.supervise(drift_rx));
    }

    async fn run_connect(
        &self,
        attempt: u64,
        params: &RequiredParameters,
        connector: ConnectorKind,
        chain_id: Option<u64>,
    ) -> Result<ConnectionSession, Abort> {
        let network = self
            .catalog
            .resolve(chain_id)
            .map_err(|e| Abort::Failed(FailureReason::NoNetworkAvailable(e.to_string())))?;

        let descriptor = self
            .registry
            .activate(&self.wallet, connector)
            .await
            .map_err(|e| Abort::Failed(FailureReason::ConnectorUnavailable(e.to_string())))?;
        if let Err(abort) = self.advance(attempt, ConnectionAction::ConnectorActivated) {
            if let Some(handle) = &descriptor.activation_handle {
                self.registry.release(&self.wallet, handle);
            }
            return Err(abort);
        }

        self.handshake(attempt, params, network, connector).await
    }

    async fn handshake(
        &self,
        attempt: u64,
        params: &RequiredParameters,
        network: NetworkConfig,
        connector: ConnectorKind,
    ) -> Result<ConnectionSession, Abort> {
        {
            let mut state = self.state();
            if state.generation != attempt {
                return Err(Abort::Superseded);
            }
            state.last_network = Some(network.clone());
        }

        self.wallet
            .switch_network(network.chain_id)
            .await
            .map_err(|e| Abort::Failed(FailureReason::NetworkSwitchRejected(e.to_string())))?;
        self.advance(attempt, ConnectionAction::NetworkSwitched)?;

        if self.wallet.requires_network_injection(connector) {
            self.wallet
                .inject_network(&network)
                .await
                .map_err(|e| Abort::Failed(FailureReason::ProviderInjectionFailed(e.to_string())))?;
        }
        self.advance(attempt, ConnectionAction::ProviderNetworkReady)?;

        let transport = |e: crate::ports::PortError| {
            Abort::Failed(FailureReason::AuthorizationTransportError(e.to_string()))
        };
        let signer = self.wallet.signer().await.map_err(transport)?;
        let challenge = self
            .authorization
            .challenge(signer.account)
            .await
            .map_err(transport)?;
        let signature = self
            .wallet
            .sign_message(&signer, challenge.message.as_bytes())
            .await
            .map_err(transport)?;
        let verdict = self
            .authorization
            .verify(signer.account, &challenge, &signature)
            .await
            .map_err(transport)?;
        if !verdict.authorized {
            return Err(Abort::Failed(FailureReason::NotAuthorized));
        }
        self.advance(attempt, ConnectionAction::Authorized)?;

        let organization_address = params.organization_address();
        let request = SdkInitRequest {
            signer: signer.clone(),
            organization_address,
            chain_id: network.chain_id,
            rpc_url: network.primary_rpc_url().map(str::to_owned),
            contracts: network.contracts.clone(),
        };
        self.backend
            .init(&request)
            .await
            .map_err(|e| Abort::Failed(FailureReason::BackendInitFailed(e.to_string())))?;

        let mut state = self.state();
        if state.generation != attempt {
            return Err(Abort::Superseded);
        }
        let observed = self.wallet.current_account().unwrap_or(signer.account);
        if observed != signer.account {
            tracing::warn!(
                authorized = %signer.account,
                observed = %observed,
                "account changed before the session was published"
            );
            return Err(Abort::Failed(FailureReason::NotAuthorized));
        }
        self.apply(&mut state, ConnectionAction::BackendInitialized)
            .map_err(illegal)?;
        state.eager_intent = false;
        let session = connected_session(observed, network.chain_id, organization_address, connector);
        self.sessions.publish(session.clone());
        tracing::info!(
            account = %observed,
            chain_id = network.chain_id,
            organization = %organization_address,
            "session published"
        );
        Ok(session)
    }

    fn begin(&self) -> Result<u64, RejectReason> {
        let mut state = self.state();
        if let Some(reject) = busy(&state) {
            tracing::debug!(?reject, "connect rejected");
            return Err(reject);
        }
        state.generation += 1;
        self.apply(&mut state, ConnectionAction::Connect).map_err(|e| {
            tracing::error!(error = %e, "connect refused");
            RejectReason::AttemptInFlight
        })?;
        Ok(state.generation)
    }

    fn advance(&self, attempt: u64, action: ConnectionAction) -> Result<(), Abort> {
        let mut state = self.state();
        if state.generation != attempt {
            return Err(Abort::Superseded);
        }
        self.apply(&mut state, action).map_err(illegal)?;
        Ok(())
    }

    fn conclude(&self, attempt: u64, result: Result<ConnectionSession, Abort>) -> CommandOutcome {
        match result {
            Ok(session) => {
                self.presentation.on_connected(&session);
                CommandOutcome::Connected(session)
            }
            Err(Abort::Superseded) => {
                tracing::info!(attempt, "connect attempt superseded");
                CommandOutcome::Superseded
            }
            Err(Abort::Failed(reason)) => self.fail(attempt, reason),
        }
    }

    fn fail(&self, attempt: u64, reason: FailureReason) -> CommandOutcome {
        {
            let mut state = self.state();
            if state.generation != attempt {
                tracing::info!(attempt, error = %reason, "late failure of a superseded attempt");
                return CommandOutcome::Superseded;
            }
            if let Err(e) = self.apply(&mut state, ConnectionAction::StepFailed(reason.clone())) {
                tracing::error!(error = %e, "failure transition refused");
            }
            self.registry.deactivate(&self.wallet);
            self.sessions.clear();
            state.eager_intent = false;
            if let Err(e) = self.apply(&mut state, ConnectionAction::RolledBack) {
                tracing::error!(error = %e, "rollback transition refused");
            }
            state.generation += 1;
            state.last_failure = Some(reason.clone());
        }
        tracing::warn!(attempt, code = reason.code(), error = %reason, "connect attempt failed");
        self.presentation.on_connect_failed(&reason);
        CommandOutcome::Failed(reason)
    }

    fn reject_selection(&self, reason: FailureReason) -> CommandOutcome {
        {
            let mut state = self.state();
            self.registry.deactivate(&self.wallet);
            state.selecting = false;
            state.eager_intent = false;
            state.last_failure = Some(reason.clone());
        }
        tracing::warn!(code = reason.code(), error = %reason, "connector selection failed");
        self.presentation.on_connect_failed(&reason);
        CommandOutcome::Failed(reason)
    }

    fn apply(
        &self,
        state: &mut CoordinatorState,
        action: ConnectionAction,
    ) -> Result<StateTransition, TransitionError> {
        let action_label = action.label();
        let (next, transition) = connection_transition(&state.status, action)?;
        state.event_seq += 1;
        state.log.push(TransitionLogRecord {
            event_seq: state.event_seq,
            attempt: state.generation,
            action: action_label.to_owned(),
            state_before: transition.from.label().to_owned(),
            state_after: transition.to.label().to_owned(),
        });
        tracing::debug!(
            from = transition.from.label(),
            to = transition.to.label(),
            reason = transition.reason,
            "connection transition"
        );
        state.status = next.clone();
        self.status_tx.send_replace(next);
        Ok(transition)
    }

    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn busy(state: &CoordinatorState) -> Option<RejectReason> {
    match &state.status {
        ConnectionStatus::Disconnected if state.selecting => Some(RejectReason::AttemptInFlight),
        ConnectionStatus::Disconnected => None,
        ConnectionStatus::Connected => Some(RejectReason::AlreadyConnected),
        _ => Some(RejectReason::AttemptInFlight),
    }
}

// The generation check runs first, so an illegal pair means the attempt no
// longer owns the machine.
fn illegal(e: TransitionError) -> Abort {
    tracing::error!(error = %e, "attempt lost the state machine");
    Abort::Superseded
}

fn connected_session(
    account: Address,
    chain_id: u64,
    organization_address: Address,
    connector: ConnectorKind,
) -> ConnectionSession {
    ConnectionSession {
        status: ConnectionStatus::Connected,
        account: Some(account),
        initial_account: Some(account),
        chain_id: Some(chain_id),
        organization_address: Some(organization_address),
        connector: Some(connector),
    }
}
