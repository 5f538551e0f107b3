//! Account drift detection.
//!
//! Runs beside the coordinator for the whole load. It never touches session
//! state itself: a drift is reported over a channel and the coordinator
//! tears the session down.

use alloy::primitives::Address;
use tokio::sync::{mpsc, watch};

use crate::domain::ConnectionSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftNotice {
    pub expected: Address,
    pub observed: Address,
}

pub struct AccountWatchdog {
    accounts: watch::Receiver<Option<Address>>,
    sessions: watch::Receiver<ConnectionSession>,
    drift_tx: mpsc::Sender<DriftNotice>,
    reported: Option<Address>,
}

impl AccountWatchdog {
    pub fn new(
        accounts: watch::Receiver<Option<Address>>,
        sessions: watch::Receiver<ConnectionSession>,
        drift_tx: mpsc::Sender<DriftNotice>,
    ) -> Self {
        Self {
            accounts,
            sessions,
            drift_tx,
            reported: None,
        }
    }

    /// Returns once the account feed, the session feed or the coordinator
    /// side of the channel goes away.
    pub async fn run(mut self) {
        loop {
            if let Some(notice) = self.check() {
                tracing::warn!(
                    expected = %notice.expected,
                    observed = %notice.observed,
                    "wallet account drifted from the authorized account"
                );
                if self.drift_tx.send(notice).await.is_err() {
                    return;
                }
            }

            tokio::select! {
                changed = self.accounts.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                changed = self.sessions.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }

    fn check(&mut self) -> Option<DriftNotice> {
        let session = self.sessions.borrow_and_update().clone();
        let observed = *self.accounts.borrow_and_update();
        if !session.is_connected() {
            self.reported = None;
            return None;
        }
        let notice = detect_drift(&session, observed)?;
        // one notice per established session
        if self.reported == Some(notice.expected) {
            return None;
        }
        self.reported = Some(notice.expected);
        Some(notice)
    }
}

/// An empty observation (locked wallet) is not drift; only a different
/// account is.
pub fn detect_drift(session: &ConnectionSession, observed: Option<Address>) -> Option<DriftNotice> {
    if !session.is_connected() {
        return None;
    }
    let expected = session.initial_account?;
    let observed = observed?;
    (observed != expected).then_some(DriftNotice { expected, observed })
}
