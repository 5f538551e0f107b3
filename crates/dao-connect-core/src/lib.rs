pub mod catalog;
pub mod coordinator;
pub mod domain;
pub mod params;
pub mod ports;
pub mod registry;
pub mod session;
pub mod state_machine;
pub mod watchdog;

pub use catalog::{CatalogError, NetworkCatalog};
pub use coordinator::{CommandOutcome, ConnectionCommand, ConnectionCoordinator, RejectReason};
pub use domain::{
    ActivationHandle, ConnectionSession, ConnectorDescriptor, ConnectorKind, FailureReason,
    NetworkConfig, SdkInitRequest, SignerHandle,
};
pub use params::{RequiredParameterValidator, RequiredParameters, ValidationOutcome};
pub use ports::{
    AuthorizationPort, BackendSdkPort, PortError, PresentationPort, WalletBridgePort,
};
pub use registry::{ConnectorError, ConnectorRegistry};
pub use session::SessionStore;
pub use state_machine::{
    connection_transition, ConnectionAction, ConnectionStatus, StateTransition, TransitionError,
};
pub use watchdog::{AccountWatchdog, DriftNotice};
