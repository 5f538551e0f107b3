use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::domain::{ActivationHandle, ConnectorDescriptor, ConnectorKind};
use crate::ports::{PortError, WalletBridgePort};

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("{} is not available in this environment", .0.label())]
    Unavailable(ConnectorKind),
    #[error("{} activation failed: {source}", .kind.label())]
    ActivationFailed {
        kind: ConnectorKind,
        #[source]
        source: PortError,
    },
}

/// Tracks which connector is active. The activation handle lives here and
/// nowhere else.
#[derive(Debug, Default)]
pub struct ConnectorRegistry {
    active: Mutex<Option<ConnectorDescriptor>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<ConnectorDescriptor>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn available<W: WalletBridgePort>(&self, wallet: &W) -> Vec<ConnectorKind> {
        ConnectorKind::ALL
            .into_iter()
            .filter(|kind| wallet.supports(*kind))
            .collect()
    }

    pub fn active(&self) -> Option<ConnectorDescriptor> {
        self.slot().clone()
    }

    pub fn has_handle(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|d| d.activation_handle.is_some())
    }

    /// Waits on the wallet bridge for as long as the user takes to answer.
    pub async fn activate<W: WalletBridgePort>(
        &self,
        wallet: &W,
        kind: ConnectorKind,
    ) -> Result<ConnectorDescriptor, ConnectorError> {
        if !wallet.supports(kind) {
            return Err(ConnectorError::Unavailable(kind));
        }
        let handle = wallet
            .activate(kind)
            .await
            .map_err(|source| ConnectorError::ActivationFailed { kind, source })?;
        tracing::debug!(connector = kind.label(), handle = handle.as_str(), "connector activated");
        let descriptor = ConnectorDescriptor {
            kind,
            activation_handle: Some(handle),
        };
        *self.slot() = Some(descriptor.clone());
        Ok(descriptor)
    }

    pub fn deactivate<W: WalletBridgePort>(&self, wallet: &W) {
        wallet.deactivate();
        *self.slot() = None;
    }

    /// Drops an activation that lost its attempt, unless a newer one replaced it.
    pub fn release<W: WalletBridgePort>(&self, wallet: &W, handle: &ActivationHandle) {
        let mut slot = self.slot();
        let current = slot
            .as_ref()
            .and_then(|d| d.activation_handle.as_ref())
            .is_some_and(|h| h == handle);
        if current {
            *slot = None;
            drop(slot);
            wallet.deactivate();
        }
    }
}
