mod common;

use dao_connect_core::{
    CommandOutcome, ConnectionCommand, ConnectionStatus, ConnectorKind, FailureReason,
    RejectReason,
};

use common::{
    account_a, account_b, log_actions, new_coordinator, org_address, params, PresentationEvent,
};

#[tokio::test]
async fn happy_path_publishes_session_and_signals_shim() {
    let coord = new_coordinator();
    let mut status_rx = coord.subscribe();

    let outcome = coord
        .connect(&params(), ConnectorKind::BrowserWallet, None)
        .await;

    let CommandOutcome::Connected(session) = outcome else {
        panic!("expected connected outcome");
    };
    assert_eq!(session.account, Some(account_a()));
    assert_eq!(session.initial_account, Some(account_a()));
    assert_eq!(session.chain_id, Some(80001));
    assert_eq!(session.organization_address, Some(org_address()));
    assert_eq!(session.connector, Some(ConnectorKind::BrowserWallet));

    assert_eq!(coord.status(), ConnectionStatus::Connected);
    assert_eq!(*status_rx.borrow_and_update(), ConnectionStatus::Connected);
    assert_eq!(coord.sessions().current(), session);
    assert_eq!(coord.sessions().publish_count(), 1);
    assert_eq!(
        coord.presentation.events(),
        vec![PresentationEvent::Connected(session)]
    );

    assert_eq!(
        coord.wallet.calls(),
        vec![
            "activate",
            "switch_network",
            "inject_network",
            "signer",
            "sign_message"
        ]
    );
    assert_eq!(coord.wallet.chain_id.get(), 80001);

    let requests = coord.backend.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].organization_address, org_address());
    assert_eq!(requests[0].chain_id, 80001);
    assert_eq!(requests[0].rpc_url.as_deref(), Some("https://rpc-mumbai.example"));
    assert_eq!(requests[0].signer.account, account_a());

    assert_eq!(
        log_actions(&coord),
        vec![
            "connect",
            "connector_activated",
            "network_switched",
            "provider_network_ready",
            "authorized",
            "backend_initialized"
        ]
    );
    let seqs: Vec<u64> = coord.transition_log().iter().map(|r| r.event_seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn rejected_network_switch_rolls_back_without_validation_signal() {
    let coord = new_coordinator();
    coord.wallet.fail_switch.set(true);

    let outcome = coord
        .connect(&params(), ConnectorKind::BrowserWallet, None)
        .await;

    assert!(matches!(
        outcome,
        CommandOutcome::Failed(FailureReason::NetworkSwitchRejected(_))
    ));
    assert_eq!(coord.status(), ConnectionStatus::Disconnected);
    assert!(coord.sessions().is_empty());
    assert_eq!(coord.sessions().publish_count(), 0);
    assert!(coord.wallet.deactivations.get() >= 1);
    assert!(coord.registry.active().is_none());
    assert!(matches!(
        coord.last_failure(),
        Some(FailureReason::NetworkSwitchRejected(_))
    ));
    assert_eq!(
        coord
            .presentation
            .count(|e| matches!(e, PresentationEvent::ValidationFailed(_))),
        0
    );
    assert_eq!(
        coord
            .presentation
            .count(|e| matches!(e, PresentationEvent::ConnectFailed(_))),
        1
    );

    let actions = log_actions(&coord);
    assert_eq!(&actions[actions.len() - 2..], ["step_failed", "rolled_back"]);
    let failed = &coord.transition_log()[actions.len() - 2];
    assert_eq!(failed.state_before, "SwitchingNetwork");
    assert_eq!(failed.state_after, "Failed");
}

#[tokio::test]
async fn not_authorized_never_publishes_or_initializes_backend() {
    let coord = new_coordinator();
    coord.authorization.authorized.set(false);

    let outcome = coord
        .connect(&params(), ConnectorKind::BrowserWallet, None)
        .await;

    assert_eq!(outcome, CommandOutcome::Failed(FailureReason::NotAuthorized));
    assert!(!FailureReason::NotAuthorized.is_transient());
    assert_eq!(coord.status(), ConnectionStatus::Disconnected);
    assert_eq!(coord.sessions().publish_count(), 0);
    assert!(coord.backend.requests.borrow().is_empty());
    assert_eq!(coord.authorization.verified.borrow().as_slice(), [account_a()]);
}

#[tokio::test]
async fn authorization_faults_are_transport_errors() {
    let coord = new_coordinator();
    coord.authorization.fail_transport.set(true);
    let outcome = coord
        .connect(&params(), ConnectorKind::BrowserWallet, None)
        .await;
    let CommandOutcome::Failed(reason) = outcome else {
        panic!("expected failure");
    };
    assert!(matches!(reason, FailureReason::AuthorizationTransportError(_)));
    assert!(reason.is_transient());

    // a refused signature takes the same path
    coord.authorization.fail_transport.set(false);
    coord.wallet.fail_sign.set(true);
    let outcome = coord
        .connect(&params(), ConnectorKind::BrowserWallet, None)
        .await;
    assert!(matches!(
        outcome,
        CommandOutcome::Failed(FailureReason::AuthorizationTransportError(_))
    ));
    assert_eq!(coord.sessions().publish_count(), 0);
}

#[tokio::test]
async fn backend_init_failure_leaves_no_partial_session() {
    let coord = new_coordinator();
    coord.backend.fail.set(true);

    let outcome = coord
        .connect(&params(), ConnectorKind::BrowserWallet, None)
        .await;

    assert!(matches!(
        outcome,
        CommandOutcome::Failed(FailureReason::BackendInitFailed(_))
    ));
    assert!(coord.sessions().is_empty());
    assert_eq!(coord.sessions().publish_count(), 0);
    assert_eq!(coord.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn provider_injection_failure_rolls_back() {
    let coord = new_coordinator();
    coord.wallet.fail_inject.set(true);
    let outcome = coord
        .connect(&params(), ConnectorKind::BrowserWallet, None)
        .await;
    assert!(matches!(
        outcome,
        CommandOutcome::Failed(FailureReason::ProviderInjectionFailed(_))
    ));
    assert!(!coord.wallet.calls().contains(&"signer"));
}

#[tokio::test]
async fn relay_connector_skips_network_injection() {
    let coord = new_coordinator();
    coord.wallet.fail_inject.set(true);

    let outcome = coord
        .connect(&params(), ConnectorKind::RelayProtocol, Some(137))
        .await;

    let CommandOutcome::Connected(session) = outcome else {
        panic!("expected connected outcome");
    };
    assert_eq!(session.chain_id, Some(137));
    assert!(!coord.wallet.calls().contains(&"inject_network"));
    assert!(log_actions(&coord).contains(&"provider_network_ready".to_owned()));
}

#[tokio::test]
async fn unsupported_connector_and_unknown_chain_fail_cleanly() {
    let coord = new_coordinator();
    coord
        .wallet
        .unsupported
        .borrow_mut()
        .push(ConnectorKind::RelayProtocol);
    assert_eq!(coord.available_connectors(), vec![ConnectorKind::BrowserWallet]);

    let outcome = coord
        .connect(&params(), ConnectorKind::RelayProtocol, None)
        .await;
    assert!(matches!(
        outcome,
        CommandOutcome::Failed(FailureReason::ConnectorUnavailable(_))
    ));
    assert_eq!(coord.status(), ConnectionStatus::Disconnected);

    let outcome = coord
        .connect(&params(), ConnectorKind::BrowserWallet, Some(5))
        .await;
    assert!(matches!(
        outcome,
        CommandOutcome::Failed(FailureReason::NoNetworkAvailable(_))
    ));
    assert_eq!(coord.wallet.activations.get(), 0);
}

#[tokio::test]
async fn disconnect_is_idempotent_and_clears_each_time() {
    let coord = new_coordinator();
    assert_eq!(coord.disconnect(), CommandOutcome::Disconnected);
    assert!(coord.presentation.events().is_empty());

    coord
        .connect(&params(), ConnectorKind::BrowserWallet, None)
        .await;
    let clears_before = coord.sessions().clear_count();

    assert_eq!(
        coord.handle(ConnectionCommand::Disconnect).await,
        CommandOutcome::Disconnected
    );
    assert_eq!(coord.disconnect(), CommandOutcome::Disconnected);

    assert_eq!(coord.status(), ConnectionStatus::Disconnected);
    assert!(coord.sessions().is_empty());
    assert_eq!(coord.sessions().clear_count(), clears_before + 2);
    assert!(coord.registry.active().is_none());
    assert_eq!(
        coord
            .presentation
            .count(|e| *e == PresentationEvent::Disconnected),
        1
    );
}

#[tokio::test]
async fn second_connect_while_in_flight_is_rejected() {
    let coord = new_coordinator();
    coord.wallet.hold_switch.set(true);
    let params = params();

    let (first, second) = tokio::join!(
        coord.connect(&params, ConnectorKind::BrowserWallet, None),
        async {
            let outcome = coord
                .connect(&params, ConnectorKind::RelayProtocol, None)
                .await;
            coord.wallet.switch_gate.notify_one();
            outcome
        }
    );

    assert!(matches!(first, CommandOutcome::Connected(_)));
    assert_eq!(second, CommandOutcome::Rejected(RejectReason::AttemptInFlight));
    assert_eq!(coord.sessions().publish_count(), 1);

    let third = coord
        .connect(&params, ConnectorKind::BrowserWallet, None)
        .await;
    assert_eq!(third, CommandOutcome::Rejected(RejectReason::AlreadyConnected));
    assert_eq!(coord.sessions().publish_count(), 1);
}

#[tokio::test]
async fn disconnect_during_connect_supersedes_the_attempt() {
    let coord = new_coordinator();
    coord.wallet.hold_switch.set(true);
    let mut status_rx = coord.subscribe();
    let params = params();

    let (outcome, _) = tokio::join!(
        coord.connect(&params, ConnectorKind::BrowserWallet, None),
        async {
            status_rx
                .wait_for(|s| *s == ConnectionStatus::SwitchingNetwork)
                .await
                .expect("attempt reaches network switch");
            coord.disconnect();
            coord.wallet.switch_gate.notify_one();
        }
    );

    assert_eq!(outcome, CommandOutcome::Superseded);
    assert_eq!(coord.status(), ConnectionStatus::Disconnected);
    assert_eq!(coord.sessions().publish_count(), 0);
    assert!(coord.sessions().is_empty());
    assert!(coord.registry.active().is_none());
    assert_eq!(
        coord
            .presentation
            .count(|e| matches!(e, PresentationEvent::Connected(_))),
        0
    );
    assert!(coord.last_failure().is_none());

    // the machine is free for a fresh attempt
    coord.wallet.hold_switch.set(false);
    let outcome = coord
        .connect(&params, ConnectorKind::BrowserWallet, None)
        .await;
    assert!(matches!(outcome, CommandOutcome::Connected(_)));
}

#[tokio::test]
async fn account_switch_during_backend_init_is_never_published() {
    let coord = new_coordinator();
    coord.backend.hold_init.set(true);
    let params = params();

    let (outcome, _) = tokio::join!(
        coord.connect(&params, ConnectorKind::BrowserWallet, None),
        async {
            while coord.backend.requests.borrow().is_empty() {
                tokio::task::yield_now().await;
            }
            coord.wallet.switch_account(account_b());
            coord.backend.init_gate.notify_one();
        }
    );

    assert_eq!(outcome, CommandOutcome::Failed(FailureReason::NotAuthorized));
    assert_eq!(coord.authorization.verified.borrow().as_slice(), [account_a()]);
    assert_eq!(
        coord.backend.requests.borrow()[0].signer.account,
        account_a()
    );
    assert_eq!(coord.status(), ConnectionStatus::Disconnected);
    assert!(coord.sessions().is_empty());
    assert_eq!(coord.sessions().publish_count(), 0);
    assert!(coord.registry.active().is_none());
    assert_eq!(
        coord
            .presentation
            .count(|e| matches!(e, PresentationEvent::Connected(_))),
        0
    );
    let actions = log_actions(&coord);
    assert_eq!(&actions[actions.len() - 2..], ["step_failed", "rolled_back"]);
}

#[tokio::test]
async fn connect_is_refused_while_a_connector_prompt_is_open() {
    let coord = new_coordinator();
    coord.wallet.hold_activate.set(true);
    let params = params();

    let (selected, competing) = tokio::join!(
        coord.select_connector(ConnectorKind::BrowserWallet, None),
        async {
            while !coord.wallet.calls().contains(&"activate") {
                tokio::task::yield_now().await;
            }
            let outcome = coord
                .connect(&params, ConnectorKind::RelayProtocol, None)
                .await;
            let resumed = coord.eager_reconnect(&params).await;
            coord.wallet.activate_gate.notify_one();
            (outcome, resumed)
        }
    );

    assert!(matches!(selected, CommandOutcome::ConnectorSelected(_)));
    assert_eq!(
        competing,
        (
            CommandOutcome::Rejected(RejectReason::AttemptInFlight),
            CommandOutcome::Rejected(RejectReason::AttemptInFlight)
        )
    );
    assert_eq!(coord.wallet.activations.get(), 1);
    assert_eq!(coord.wallet.deactivations.get(), 0);

    coord.wallet.hold_activate.set(false);
    let outcome = coord.eager_reconnect(&params).await;
    assert!(matches!(outcome, CommandOutcome::Connected(_)));
}

#[tokio::test]
async fn disconnect_during_selection_drops_the_late_activation() {
    let coord = new_coordinator();
    coord.wallet.hold_activate.set(true);

    let (selected, refused) = tokio::join!(
        coord.select_connector(ConnectorKind::BrowserWallet, None),
        async {
            while !coord.wallet.calls().contains(&"activate") {
                tokio::task::yield_now().await;
            }
            coord.disconnect();
            let refused = coord
                .connect(&params(), ConnectorKind::BrowserWallet, None)
                .await;
            coord.wallet.activate_gate.notify_one();
            refused
        }
    );

    assert_eq!(selected, CommandOutcome::Superseded);
    assert_eq!(refused, CommandOutcome::Rejected(RejectReason::AttemptInFlight));
    assert!(coord.registry.active().is_none());
    assert_eq!(
        coord.eager_reconnect(&params()).await,
        CommandOutcome::Rejected(RejectReason::NoActiveConnector)
    );

    coord.wallet.hold_activate.set(false);
    let outcome = coord
        .connect(&params(), ConnectorKind::BrowserWallet, None)
        .await;
    assert!(matches!(outcome, CommandOutcome::Connected(_)));
}

#[tokio::test]
async fn eager_reconnect_resumes_without_activation() {
    let coord = new_coordinator();

    assert_eq!(
        coord.eager_reconnect(&params()).await,
        CommandOutcome::Rejected(RejectReason::NoActiveConnector)
    );

    let selected = coord
        .handle(ConnectionCommand::SelectConnector {
            connector: ConnectorKind::BrowserWallet,
            chain_id: Some(137),
        })
        .await;
    let CommandOutcome::ConnectorSelected(descriptor) = selected else {
        panic!("expected selection");
    };
    assert_eq!(descriptor.kind, ConnectorKind::BrowserWallet);
    assert_eq!(coord.status(), ConnectionStatus::Disconnected);
    assert_eq!(coord.wallet.activations.get(), 1);

    let outcome = coord
        .handle(ConnectionCommand::EagerReconnect { params: params() })
        .await;
    let CommandOutcome::Connected(session) = outcome else {
        panic!("expected connected outcome");
    };
    assert_eq!(session.chain_id, Some(137));
    assert_eq!(coord.wallet.activations.get(), 1);
    assert_eq!(
        log_actions(&coord).first().map(String::as_str),
        Some("resume_with_connector")
    );
}

#[tokio::test]
async fn eager_reconnect_is_forgotten_after_disconnect() {
    let coord = new_coordinator();
    coord
        .select_connector(ConnectorKind::RelayProtocol, None)
        .await;
    coord.disconnect();

    assert_eq!(
        coord.eager_reconnect(&params()).await,
        CommandOutcome::Rejected(RejectReason::NoActiveConnector)
    );
}

#[tokio::test]
async fn account_drift_disconnects_the_session() {
    let coord = new_coordinator();
    let mut sessions_rx = coord.sessions().subscribe();

    tokio::select! {
        _ = coord.run_account_watchdog() => panic!("watchdog stopped"),
        _ = async {
            let outcome = coord
                .connect(&params(), ConnectorKind::BrowserWallet, None)
                .await;
            assert!(matches!(outcome, CommandOutcome::Connected(_)));

            coord.wallet.switch_account(account_b());
            sessions_rx
                .wait_for(|s| s.is_empty())
                .await
                .expect("session cleared");
        } => {}
    }

    assert_eq!(coord.status(), ConnectionStatus::Disconnected);
    assert!(coord.registry.active().is_none());
    assert_eq!(
        coord
            .presentation
            .count(|e| *e == PresentationEvent::Disconnected),
        1
    );
}
