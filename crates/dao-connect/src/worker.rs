//! Coordinator thread.
//!
//! The coordinator's futures are not `Send`, so it lives on its own thread
//! with a current-thread runtime and a `LocalSet`. Commands are spawned as
//! local tasks so a disconnect can overtake an attempt that is waiting on
//! the wallet.

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use eyre::WrapErr;
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use dao_connect_adapters::{
    AuthServiceAdapter, BackendSdkAdapter, ConnectAdapterConfig, WalletBridgeAdapter,
};
use dao_connect_core::{
    CommandOutcome, ConnectionCommand, ConnectionCoordinator, NetworkCatalog, ValidationOutcome,
};

use crate::shim::PresentationShim;

pub const ACCOUNT_POLL_INTERVAL: Duration = Duration::from_secs(2);

type ShellCoordinator = ConnectionCoordinator<
    WalletBridgeAdapter,
    AuthServiceAdapter,
    BackendSdkAdapter,
    PresentationShim,
>;

pub struct ConnectionWorker {
    commands: mpsc::UnboundedSender<ConnectionCommand>,
}

impl ConnectionWorker {
    pub fn spawn(
        config: ConnectAdapterConfig,
        catalog: NetworkCatalog,
        query: String,
        shim: PresentationShim,
    ) -> eyre::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .wrap_err("building worker runtime")?;
        let (commands, rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name("dao-connect-worker".to_owned())
            .spawn(move || {
                let coordinator = Rc::new(ConnectionCoordinator::new(
                    WalletBridgeAdapter::with_config(config.clone()),
                    AuthServiceAdapter::with_config(config.clone()),
                    BackendSdkAdapter::with_config(config),
                    shim.clone(),
                    catalog,
                ));
                LocalSet::new().block_on(&runtime, run(coordinator, shim, query, rx));
                tracing::info!("connection worker stopped");
            })
            .wrap_err("spawning connection worker")?;

        Ok(Self { commands })
    }

    pub fn send(&self, command: ConnectionCommand) -> eyre::Result<()> {
        self.commands
            .send(command)
            .map_err(|_| eyre::eyre!("connection worker is gone"))
    }
}

async fn run(
    coordinator: Rc<ShellCoordinator>,
    shim: PresentationShim,
    query: String,
    mut commands: mpsc::UnboundedReceiver<ConnectionCommand>,
) {
    // every load starts without a wallet
    coordinator.disconnect();
    if let ValidationOutcome::Valid(params) = coordinator.validate_request(&query) {
        shim.accept_parameters(params);
    }
    shim.set_connectors(coordinator.available_connectors());

    let watchdog = Rc::clone(&coordinator);
    tokio::task::spawn_local(async move { watchdog.run_account_watchdog().await });

    let poller = Rc::clone(&coordinator);
    tokio::task::spawn_local(async move { poll_accounts(&poller).await });

    let mut status_rx = coordinator.subscribe();
    let status_shim = shim.clone();
    tokio::task::spawn_local(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            status_shim.set_status(status);
        }
    });

    while let Some(command) = commands.recv().await {
        tracing::debug!(?command, "command received");
        let coordinator = Rc::clone(&coordinator);
        let shim = shim.clone();
        tokio::task::spawn_local(async move { execute(&coordinator, &shim, command).await });
    }

    coordinator.disconnect();
}

/// Runs one command. A connector picked in the modal goes straight into the
/// handshake through the eager path.
async fn execute(
    coordinator: &ShellCoordinator,
    shim: &PresentationShim,
    command: ConnectionCommand,
) {
    let outcome = coordinator.handle(command).await;
    shim.record_outcome(&outcome);
    let CommandOutcome::ConnectorSelected(descriptor) = outcome else {
        return;
    };
    let Some(params) = shim.snapshot().parameters else {
        tracing::warn!("connector selected without link parameters");
        return;
    };
    tracing::debug!(connector = descriptor.kind.label(), "resuming with selected connector");
    let outcome = coordinator
        .handle(ConnectionCommand::EagerReconnect { params })
        .await;
    shim.record_outcome(&outcome);
}

/// Proxy-backed wallets push no events, so the active account is polled
/// while a session is live.
async fn poll_accounts(coordinator: &ShellCoordinator) {
    let mut ticker = tokio::time::interval(ACCOUNT_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        if !coordinator.sessions().current().is_connected() {
            continue;
        }
        if let Err(e) = coordinator.wallet.refresh_account().await {
            tracing::debug!(error = %e, "account poll failed");
        }
    }
}
