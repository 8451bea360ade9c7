use std::sync::Arc;

use dashmap::DashMap;
use pinfeed_core::{update, ConsumerId, Effect, Msg, QueueSettings, Session, SessionView};
use pinfeed_logging::feed_info;
use tokio::sync::{Mutex, Notify};

/// One consumer's session plus the wake-up used by waiting block requests.
///
/// All mutation goes through `apply`, which holds the lock for the whole
/// update so the in-flight check and claim happen atomically.
pub struct SessionSlot {
    session: Mutex<Session>,
    changed: Notify,
}

impl SessionSlot {
    fn new(settings: QueueSettings) -> Self {
        Self {
            session: Mutex::new(Session::with_settings(settings)),
            changed: Notify::new(),
        }
    }

    pub async fn apply(&self, msg: Msg) -> Vec<Effect> {
        let mut guard = self.session.lock().await;
        let session = std::mem::take(&mut *guard);
        let (session, effects) = update(session, msg);
        *guard = session;
        effects
    }

    pub async fn inspect<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        let guard = self.session.lock().await;
        f(&*guard)
    }

    pub async fn view(&self) -> SessionView {
        self.inspect(Session::view).await
    }

    /// Future resolved by the next `notify_changed`. Create it before checking
    /// state so a change in between is not missed.
    pub(crate) fn changed(&self) -> tokio::sync::futures::Notified<'_> {
        self.changed.notified()
    }

    pub(crate) fn notify_changed(&self) {
        self.changed.notify_waiters();
    }
}

/// Process-wide map from consumer to session. Sessions live until the process exits.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<ConsumerId, Arc<SessionSlot>>>,
    settings: QueueSettings,
}

impl SessionStore {
    pub fn new(settings: QueueSettings) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            settings,
        }
    }

    pub fn get_or_create(&self, consumer: ConsumerId) -> Arc<SessionSlot> {
        if let Some(slot) = self.sessions.get(&consumer) {
            return Arc::clone(slot.value());
        }
        let slot = self.sessions.entry(consumer).or_insert_with(|| {
            feed_info!("Created session for consumer={}", consumer);
            Arc::new(SessionSlot::new(self.settings))
        });
        Arc::clone(slot.value())
    }

    pub fn get(&self, consumer: ConsumerId) -> Option<Arc<SessionSlot>> {
        self.sessions
            .get(&consumer)
            .map(|slot| Arc::clone(slot.value()))
    }

    pub async fn view(&self, consumer: ConsumerId) -> Option<SessionView> {
        let slot = self.get(consumer)?;
        Some(slot.view().await)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
