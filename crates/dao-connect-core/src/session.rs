use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::ConnectionSession;

/// Published copy of the resolved session. Readers clone freely; only the
/// coordinator in this crate can write.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    tx: watch::Sender<ConnectionSession>,
    published: AtomicU64,
    cleared: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        let (tx, _) = watch::channel(ConnectionSession::disconnected());
        Self {
            inner: Arc::new(SessionStoreInner {
                tx,
                published: AtomicU64::new(0),
                cleared: AtomicU64::new(0),
            }),
        }
    }
}

impl SessionStore {
    pub fn current(&self) -> ConnectionSession {
        self.inner.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionSession> {
        self.inner.tx.subscribe()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tx.borrow().is_empty()
    }

    pub fn publish_count(&self) -> u64 {
        self.inner.published.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> u64 {
        self.inner.cleared.load(Ordering::SeqCst)
    }

    pub(crate) fn publish(&self, session: ConnectionSession) {
        self.inner.tx.send_replace(session);
        self.inner.published.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn clear(&self) {
        self.inner.tx.send_replace(ConnectionSession::disconnected());
        self.inner.cleared.fetch_add(1, Ordering::SeqCst);
    }
}
