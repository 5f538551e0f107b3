use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use alloy::primitives::{Address, Bytes};
use tokio::sync::watch;

use dao_connect_core::{
    ActivationHandle, ConnectorKind, NetworkConfig, PortError, SignerHandle, WalletBridgePort,
};

use crate::{ConnectAdapterConfig, Eip1193Adapter, RelayAdapter};

/// Routes wallet bridge calls to whichever connector is active and mirrors
/// its account onto a watch channel.
#[derive(Debug)]
pub struct WalletBridgeAdapter {
    browser: Eip1193Adapter,
    relay: RelayAdapter,
    active: Mutex<Option<ConnectorKind>>,
    activations: AtomicU64,
    accounts_tx: watch::Sender<Option<Address>>,
}

impl Default for WalletBridgeAdapter {
    fn default() -> Self {
        Self::with_config(ConnectAdapterConfig::from_env())
    }
}

impl WalletBridgeAdapter {
    pub fn new(browser: Eip1193Adapter, relay: RelayAdapter) -> Self {
        let (accounts_tx, _) = watch::channel(None);
        Self {
            browser,
            relay,
            active: Mutex::new(None),
            activations: AtomicU64::new(0),
            accounts_tx,
        }
    }

    pub fn with_config(config: ConnectAdapterConfig) -> Self {
        Self::new(
            Eip1193Adapter::with_config(config.clone()),
            RelayAdapter::with_config(config),
        )
    }

    pub fn browser(&self) -> &Eip1193Adapter {
        &self.browser
    }

    pub fn relay(&self) -> &RelayAdapter {
        &self.relay
    }

    pub fn active_connector(&self) -> Option<ConnectorKind> {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_active(&self) -> Result<ConnectorKind, PortError> {
        let g = self
            .active
            .lock()
            .map_err(|e| PortError::Transport(format!("bridge lock poisoned: {e}")))?;
        g.ok_or_else(|| PortError::NotFound("no active connector".to_owned()))
    }

    fn publish_account(&self, account: Option<Address>) {
        self.accounts_tx.send_if_modified(|current| {
            if *current == account {
                return false;
            }
            *current = account;
            true
        });
    }

    /// Polls the active connector for its account and publishes changes.
    pub async fn refresh_account(&self) -> Result<Option<Address>, PortError> {
        let account = match self.active_connector() {
            Some(ConnectorKind::BrowserWallet) => {
                self.browser.accounts().await?.first().copied()
            }
            Some(ConnectorKind::RelayProtocol) => self.relay.refresh().await?.first().copied(),
            None => return Ok(None),
        };
        // a locked wallet exposes nothing; keep the last known account
        if account.is_some() {
            self.publish_account(account);
        }
        Ok(account)
    }

    /// Simulates an `accountsChanged` event on the active connector.
    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        let first = accounts.first().copied();
        match self.require_active()? {
            ConnectorKind::BrowserWallet => self.browser.debug_inject_accounts_changed(accounts)?,
            ConnectorKind::RelayProtocol => self.relay.debug_inject_accounts_changed(accounts)?,
        }
        self.accounts_tx.send_replace(first);
        Ok(())
    }
}

impl WalletBridgePort for WalletBridgeAdapter {
    fn supports(&self, kind: ConnectorKind) -> bool {
        match kind {
            ConnectorKind::BrowserWallet => self.browser.is_available(),
            ConnectorKind::RelayProtocol => self.relay.is_available(),
        }
    }

    async fn activate(&self, kind: ConnectorKind) -> Result<ActivationHandle, PortError> {
        let account = match kind {
            ConnectorKind::BrowserWallet => self.browser.request_accounts().await?.first().copied(),
            ConnectorKind::RelayProtocol => self.relay.pair().await?.accounts.first().copied(),
        };
        {
            let mut g = self
                .active
                .lock()
                .map_err(|e| PortError::Transport(format!("bridge lock poisoned: {e}")))?;
            *g = Some(kind);
        }
        self.publish_account(account);
        let n = self.activations.fetch_add(1, Ordering::SeqCst) + 1;
        let prefix = match kind {
            ConnectorKind::BrowserWallet => "eip1193",
            ConnectorKind::RelayProtocol => "relay",
        };
        Ok(ActivationHandle::new(format!("{prefix}-{n}")))
    }

    async fn switch_network(&self, chain_id: u64) -> Result<(), PortError> {
        match self.require_active()? {
            ConnectorKind::BrowserWallet => self.browser.switch_chain(chain_id).await,
            ConnectorKind::RelayProtocol => self.relay.switch_chain(chain_id).await,
        }
    }

    fn requires_network_injection(&self, kind: ConnectorKind) -> bool {
        kind == ConnectorKind::BrowserWallet
    }

    async fn inject_network(&self, network: &NetworkConfig) -> Result<(), PortError> {
        match self.require_active()? {
            ConnectorKind::BrowserWallet => self.browser.add_chain(network).await,
            ConnectorKind::RelayProtocol => Ok(()),
        }
    }

    async fn signer(&self) -> Result<SignerHandle, PortError> {
        let connector = self.require_active()?;
        let (account, chain_id) = match connector {
            ConnectorKind::BrowserWallet => (
                self.browser.selected_account(),
                self.browser.chain_id().await?,
            ),
            ConnectorKind::RelayProtocol => {
                let session = self
                    .relay
                    .session()
                    .ok_or_else(|| PortError::NotFound("no relay session".to_owned()))?;
                (session.accounts.first().copied(), session.chain_id)
            }
        };
        let account =
            account.ok_or_else(|| PortError::NotFound("connector exposes no account".to_owned()))?;
        Ok(SignerHandle {
            account,
            connector,
            chain_id,
        })
    }

    async fn sign_message(
        &self,
        signer: &SignerHandle,
        message: &[u8],
    ) -> Result<Bytes, PortError> {
        match signer.connector {
            ConnectorKind::BrowserWallet => self.browser.personal_sign(signer.account, message).await,
            ConnectorKind::RelayProtocol => self.relay.sign(signer.account, message).await,
        }
    }

    fn current_account(&self) -> Option<Address> {
        *self.accounts_tx.borrow()
    }

    fn account_changes(&self) -> watch::Receiver<Option<Address>> {
        self.accounts_tx.subscribe()
    }

    fn deactivate(&self) {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match previous {
            Some(ConnectorKind::BrowserWallet) => self.browser.disconnect(),
            Some(ConnectorKind::RelayProtocol) => self.relay.disconnect(),
            None => {}
        }
        self.accounts_tx.send_replace(None);
    }
}
