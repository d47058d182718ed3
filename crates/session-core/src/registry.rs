//! The process-wide media session registry (spec §5: "process-wide keyed
//! mapping from stable keys ... to live handles; writes are insert-if-absent;
//! readers see-or-miss without blocking"). Keyed the same way the dialog
//! layer keys its own registry, so a `MediaSession` and its owning dialog
//! share one lookup key end to end.

use std::sync::Arc;

use dashmap::DashMap;
use sip_types::dialog_id::DialogKey;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::media_session::MediaSession;

/// Owns every live media session. One instance per `UserAgent`, mirroring
/// `sip_dialog::manager::DialogManager`'s `DashMap<DialogKey, Mutex<_>>`
/// shape.
pub struct MediaRegistry {
    sessions: DashMap<DialogKey, Mutex<MediaSession>>,
}

impl MediaRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(MediaRegistry { sessions: DashMap::new() })
    }

    /// Insert-if-absent: a second `INVITE`/offer for the same dialog key
    /// never clobbers an already-registered session.
    pub fn insert(&self, session: MediaSession) -> DialogKey {
        let key = session.dialog_key.clone();
        self.sessions.entry(key.clone()).or_insert_with(|| Mutex::new(session));
        key
    }

    pub async fn with_session<F, R>(&self, key: &DialogKey, f: F) -> Result<R>
    where
        F: FnOnce(&mut MediaSession) -> R,
    {
        let slot = self.lookup(key)?;
        let mut session = slot.lock().await;
        Ok(f(&mut session))
    }

    pub fn remove(&self, key: &DialogKey) {
        self.sessions.remove(key);
    }

    pub fn contains(&self, key: &DialogKey) -> bool {
        self.sessions.contains_key(key)
    }

    /// Snapshot of the currently registered keys. Used by callers that
    /// need to enumerate live sessions (tests, diagnostics); not on any
    /// per-call hot path.
    pub fn keys(&self) -> Vec<DialogKey> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    fn lookup(&self, key: &DialogKey) -> Result<dashmap::mapref::one::Ref<'_, DialogKey, Mutex<MediaSession>>> {
        self.sessions.get(key).ok_or_else(|| Error::NoMediaSession(key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use super::*;
    use crate::media_session::{MediaState, Role};

    fn key() -> DialogKey {
        DialogKey::new("call-1", "local-tag", "remote-tag")
    }

    #[tokio::test]
    async fn insert_then_read_round_trips() {
        let registry = MediaRegistry::new();
        let local: IpAddr = "127.0.0.1".parse().unwrap();
        let session = MediaSession::new(1, key(), Role::Uac, local);
        registry.insert(session);

        let state = registry.with_session(&key(), |s| s.state).await.unwrap();
        assert_eq!(state, MediaState::Idle);
    }

    #[tokio::test]
    async fn second_insert_for_same_key_does_not_clobber_the_first() {
        let registry = MediaRegistry::new();
        let local: IpAddr = "127.0.0.1".parse().unwrap();
        registry.insert(MediaSession::new(1, key(), Role::Uac, local));
        registry.insert(MediaSession::new(2, key(), Role::Uac, local));

        let id = registry.with_session(&key(), |s| s.id).await.unwrap();
        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn missing_session_is_an_error() {
        let registry = MediaRegistry::new();
        assert!(registry.with_session(&key(), |s| s.id).await.is_err());
    }
}
