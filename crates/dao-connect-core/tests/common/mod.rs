#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use alloy::primitives::{Address, Bytes};
use tokio::sync::{watch, Notify};

use dao_connect_core::domain::{AuthorizationResult, Challenge};
use dao_connect_core::{
    ActivationHandle, AuthorizationPort, BackendSdkPort, ConnectionCoordinator, ConnectionSession,
    ConnectorKind, FailureReason, NetworkCatalog, NetworkConfig, PortError, PresentationPort,
    RequiredParameterValidator, RequiredParameters, SdkInitRequest, SignerHandle,
    WalletBridgePort,
};

pub const ORG: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const ENTITY: &str = "0x1000000000000000000000000000000000000001";

pub fn account_a() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn account_b() -> Address {
    Address::repeat_byte(0xbb)
}

pub fn org_address() -> Address {
    ORG.parse().expect("valid org address")
}

pub fn query() -> String {
    format!(
        "?organizationAddress={ORG}&onboardingEntityAddress={ENTITY}&questId=quest-1\
         &returnUrl=https%3A%2F%2Fdao.example%2Fhome&returnUrlLinkName=Back"
    )
}

pub fn params() -> RequiredParameters {
    RequiredParameterValidator::validate(&query())
        .parameters()
        .cloned()
        .expect("valid params")
}

pub fn catalog() -> NetworkCatalog {
    let contracts = serde_json::json!({
        "organizationRegistry": "0x0000000000000000000000000000000000000011",
        "onboardingRegistry": "0x0000000000000000000000000000000000000012",
        "identityRegistry": "0x0000000000000000000000000000000000000013",
        "organizationTypeRegistry": "0x0000000000000000000000000000000000000014",
        "pluginRegistry": "0x0000000000000000000000000000000000000015"
    });
    let raw = serde_json::json!([
        { "chainId": 5, "name": "Goerli", "disabled": true, "contracts": contracts },
        {
            "chainId": "80001",
            "name": "Mumbai",
            "rpcUrls": ["https://rpc-mumbai.example"],
            "nativeCurrency": { "name": "MATIC", "symbol": "MATIC", "decimals": 18 },
            "contracts": contracts
        },
        { "chainId": 137, "name": "Polygon", "rpcUrls": ["https://polygon.example"], "contracts": contracts }
    ]);
    NetworkCatalog::from_json(&raw.to_string()).expect("catalog")
}

/// Scriptable wallet bridge. `hold_switch` parks `switch_network` until
/// `switch_gate` is notified, to stand in for a pending wallet prompt;
/// `hold_activate` does the same for the connector prompt.
pub struct FakeWallet {
    pub account: Cell<Address>,
    pub chain_id: Cell<u64>,
    pub accounts_tx: watch::Sender<Option<Address>>,
    pub unsupported: RefCell<Vec<ConnectorKind>>,
    pub fail_activate: Cell<bool>,
    pub fail_switch: Cell<bool>,
    pub fail_inject: Cell<bool>,
    pub fail_sign: Cell<bool>,
    pub hold_switch: Cell<bool>,
    pub switch_gate: Rc<Notify>,
    pub hold_activate: Cell<bool>,
    pub activate_gate: Rc<Notify>,
    pub activations: Cell<u32>,
    pub deactivations: Cell<u32>,
    pub calls: RefCell<Vec<&'static str>>,
    active: Cell<Option<ConnectorKind>>,
}

impl Default for FakeWallet {
    fn default() -> Self {
        let (accounts_tx, _) = watch::channel(None);
        Self {
            account: Cell::new(account_a()),
            chain_id: Cell::new(1),
            accounts_tx,
            unsupported: RefCell::new(Vec::new()),
            fail_activate: Cell::new(false),
            fail_switch: Cell::new(false),
            fail_inject: Cell::new(false),
            fail_sign: Cell::new(false),
            hold_switch: Cell::new(false),
            switch_gate: Rc::new(Notify::new()),
            hold_activate: Cell::new(false),
            activate_gate: Rc::new(Notify::new()),
            activations: Cell::new(0),
            deactivations: Cell::new(0),
            calls: RefCell::new(Vec::new()),
            active: Cell::new(None),
        }
    }
}

impl FakeWallet {
    /// User picks another account in the wallet UI.
    pub fn switch_account(&self, account: Address) {
        self.account.set(account);
        self.accounts_tx.send_replace(Some(account));
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.borrow_mut().push(call);
    }
}

impl WalletBridgePort for FakeWallet {
    fn supports(&self, kind: ConnectorKind) -> bool {
        !self.unsupported.borrow().contains(&kind)
    }

    async fn activate(&self, kind: ConnectorKind) -> Result<ActivationHandle, PortError> {
        self.record("activate");
        if self.hold_activate.get() {
            self.activate_gate.notified().await;
        }
        if self.fail_activate.get() {
            return Err(PortError::Rejected("user closed the prompt".to_owned()));
        }
        let n = self.activations.get() + 1;
        self.activations.set(n);
        self.active.set(Some(kind));
        self.accounts_tx.send_replace(Some(self.account.get()));
        Ok(ActivationHandle::new(format!("fake-{n}")))
    }

    async fn switch_network(&self, chain_id: u64) -> Result<(), PortError> {
        self.record("switch_network");
        if self.hold_switch.get() {
            self.switch_gate.notified().await;
        }
        if self.fail_switch.get() {
            return Err(PortError::Rejected("user rejected chain switch".to_owned()));
        }
        self.chain_id.set(chain_id);
        Ok(())
    }

    fn requires_network_injection(&self, kind: ConnectorKind) -> bool {
        kind == ConnectorKind::BrowserWallet
    }

    async fn inject_network(&self, _network: &NetworkConfig) -> Result<(), PortError> {
        self.record("inject_network");
        if self.fail_inject.get() {
            return Err(PortError::Transport("provider refused metadata".to_owned()));
        }
        Ok(())
    }

    async fn signer(&self) -> Result<SignerHandle, PortError> {
        self.record("signer");
        let connector = self
            .active
            .get()
            .ok_or_else(|| PortError::NotFound("no active connector".to_owned()))?;
        Ok(SignerHandle {
            account: self.account.get(),
            connector,
            chain_id: self.chain_id.get(),
        })
    }

    async fn sign_message(
        &self,
        _signer: &SignerHandle,
        message: &[u8],
    ) -> Result<Bytes, PortError> {
        self.record("sign_message");
        if self.fail_sign.get() {
            return Err(PortError::Rejected("user rejected signature".to_owned()));
        }
        let mut sig = vec![message.len() as u8; 65];
        sig[64] = 27;
        Ok(Bytes::from(sig))
    }

    fn current_account(&self) -> Option<Address> {
        *self.accounts_tx.borrow()
    }

    fn account_changes(&self) -> watch::Receiver<Option<Address>> {
        self.accounts_tx.subscribe()
    }

    fn deactivate(&self) {
        self.deactivations.set(self.deactivations.get() + 1);
        self.active.set(None);
        self.accounts_tx.send_replace(None);
    }
}

pub struct FakeAuth {
    pub authorized: Cell<bool>,
    pub fail_transport: Cell<bool>,
    pub challenges: Cell<u32>,
    pub verified: RefCell<Vec<Address>>,
}

impl Default for FakeAuth {
    fn default() -> Self {
        Self {
            authorized: Cell::new(true),
            fail_transport: Cell::new(false),
            challenges: Cell::new(0),
            verified: RefCell::new(Vec::new()),
        }
    }
}

impl AuthorizationPort for FakeAuth {
    async fn challenge(&self, account: Address) -> Result<Challenge, PortError> {
        if self.fail_transport.get() {
            return Err(PortError::Transport("auth service unreachable".to_owned()));
        }
        self.challenges.set(self.challenges.get() + 1);
        Ok(Challenge {
            nonce: format!("nonce-{}", self.challenges.get()),
            message: format!("Sign in as {account}"),
        })
    }

    async fn verify(
        &self,
        account: Address,
        _challenge: &Challenge,
        _signature: &Bytes,
    ) -> Result<AuthorizationResult, PortError> {
        self.verified.borrow_mut().push(account);
        Ok(AuthorizationResult {
            authorized: self.authorized.get(),
        })
    }
}

/// `hold_init` parks `init` after recording the request until `init_gate`
/// is notified.
#[derive(Default)]
pub struct FakeBackend {
    pub fail: Cell<bool>,
    pub hold_init: Cell<bool>,
    pub init_gate: Rc<Notify>,
    pub requests: RefCell<Vec<SdkInitRequest>>,
}

impl BackendSdkPort for FakeBackend {
    async fn init(&self, request: &SdkInitRequest) -> Result<(), PortError> {
        if self.fail.get() {
            return Err(PortError::Transport("sdk bootstrap failed".to_owned()));
        }
        self.requests.borrow_mut().push(request.clone());
        if self.hold_init.get() {
            self.init_gate.notified().await;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEvent {
    Connected(ConnectionSession),
    Disconnected,
    ValidationFailed(String),
    ConnectFailed(FailureReason),
}

#[derive(Default)]
pub struct RecordingPresentation {
    pub events: RefCell<Vec<PresentationEvent>>,
}

impl RecordingPresentation {
    pub fn events(&self) -> Vec<PresentationEvent> {
        self.events.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&PresentationEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }
}

impl PresentationPort for RecordingPresentation {
    fn on_connected(&self, session: &ConnectionSession) {
        self.events
            .borrow_mut()
            .push(PresentationEvent::Connected(session.clone()));
    }

    fn on_disconnected(&self) {
        self.events.borrow_mut().push(PresentationEvent::Disconnected);
    }

    fn on_validation_failed(&self, reason: &str) {
        self.events
            .borrow_mut()
            .push(PresentationEvent::ValidationFailed(reason.to_owned()));
    }

    fn on_connect_failed(&self, reason: &FailureReason) {
        self.events
            .borrow_mut()
            .push(PresentationEvent::ConnectFailed(reason.clone()));
    }
}

pub type TestCoordinator =
    ConnectionCoordinator<FakeWallet, FakeAuth, FakeBackend, RecordingPresentation>;

pub fn new_coordinator() -> TestCoordinator {
    ConnectionCoordinator::new(
        FakeWallet::default(),
        FakeAuth::default(),
        FakeBackend::default(),
        RecordingPresentation::default(),
        catalog(),
    )
}

pub fn log_actions(coord: &TestCoordinator) -> Vec<String> {
    coord
        .transition_log()
        .into_iter()
        .map(|r| r.action)
        .collect()
}
