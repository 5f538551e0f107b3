//! Presentation shim: the coordinator's signals land here and the UI reads
//! a snapshot every frame.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use eframe::egui;

use dao_connect_core::{
    CommandOutcome, ConnectionSession, ConnectionStatus, ConnectorKind, FailureReason,
    PresentationPort, RejectReason, RequiredParameters,
};

use crate::routes::Route;

#[derive(Debug, Clone)]
pub struct ShimState {
    pub status: ConnectionStatus,
    pub session: Option<ConnectionSession>,
    pub parameters: Option<RequiredParameters>,
    pub connectors: Vec<ConnectorKind>,
    pub validation_error: Option<String>,
    pub connect_error: Option<FailureReason>,
    pub notice: Option<String>,
    /// Route from the deep link, applied once a session exists.
    pub requested_route: Option<Route>,
    pub route: Option<Route>,
}

impl Default for ShimState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            session: None,
            parameters: None,
            connectors: Vec::new(),
            validation_error: None,
            connect_error: None,
            notice: None,
            requested_route: None,
            route: None,
        }
    }
}

impl ShimState {
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(ConnectionSession::is_connected)
    }

    pub fn is_busy(&self) -> bool {
        self.status.is_in_flight()
    }
}

/// Shared between the worker thread (writer) and the egui thread (reader).
#[derive(Clone)]
pub struct PresentationShim {
    state: Arc<Mutex<ShimState>>,
    ctx: egui::Context,
}

impl PresentationShim {
    pub fn new(ctx: egui::Context, requested_route: Option<Route>) -> Self {
        let state = ShimState {
            requested_route,
            ..ShimState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            ctx,
        }
    }

    pub fn snapshot(&self) -> ShimState {
        self.lock().clone()
    }

    pub fn navigate(&self, route: Route) {
        self.update(|s| {
            tracing::debug!(route = %route, "navigate");
            s.route = Some(route);
        });
    }

    pub fn accept_parameters(&self, parameters: RequiredParameters) {
        self.update(|s| {
            s.validation_error = None;
            s.parameters = Some(parameters);
        });
    }

    pub fn set_connectors(&self, connectors: Vec<ConnectorKind>) {
        self.update(|s| s.connectors = connectors);
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        self.update(|s| {
            if status.is_in_flight() {
                s.connect_error = None;
                s.notice = None;
            }
            s.status = status;
        });
    }

    /// Outcomes that no port callback reports.
    pub fn record_outcome(&self, outcome: &CommandOutcome) {
        let notice = match outcome {
            CommandOutcome::Rejected(RejectReason::AttemptInFlight) => {
                "A connection attempt is already running."
            }
            CommandOutcome::Rejected(RejectReason::AlreadyConnected) => "Already connected.",
            CommandOutcome::Rejected(RejectReason::NoActiveConnector) => {
                "Pick a wallet to continue."
            }
            CommandOutcome::Superseded => {
                tracing::debug!("connect attempt superseded");
                return;
            }
            _ => return,
        };
        self.update(|s| s.notice = Some(notice.to_owned()));
    }

    fn lock(&self) -> MutexGuard<'_, ShimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut ShimState)) {
        f(&mut self.lock());
        self.ctx.request_repaint();
    }
}

impl PresentationPort for PresentationShim {
    fn on_connected(&self, session: &ConnectionSession) {
        self.update(|s| {
            s.session = Some(session.clone());
            s.connect_error = None;
            s.notice = None;
            s.route = Some(s.requested_route.take().unwrap_or(Route::Quest));
        });
    }

    fn on_disconnected(&self) {
        self.update(|s| {
            s.session = None;
            s.route = None;
        });
    }

    fn on_validation_failed(&self, reason: &str) {
        self.update(|s| {
            s.parameters = None;
            s.validation_error = Some(reason.to_owned());
        });
    }

    fn on_connect_failed(&self, reason: &FailureReason) {
        self.update(|s| {
            s.session = None;
            s.connect_error = Some(reason.clone());
        });
    }
}
