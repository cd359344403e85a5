//! Session store: who is logged in, and with what role.
//!
//! The store mirrors two persisted keys ([`keys::LOGGED_IN`] and
//! [`keys::ROLE`]) into an in-memory [`SessionState`] that views read and
//! subscribe to. It performs no network I/O; callers validate credentials
//! with the backend before calling [`SessionStore::login`].

use std::sync::Arc;

use shopfront_core::{LoginStatus, Role, SessionState};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::storage::{StorageError, Tab, keys};

/// Persisted value of the login flag while logged in.
const LOGGED_IN_FLAG: &str = "true";

/// Shared session state for one tab.
///
/// Cheaply cloneable; clones share the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    tab: Tab,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Create an unresolved store. Call [`load`](Self::load) to resolve it.
    #[must_use]
    pub fn new(tab: Tab) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                tab,
                state: watch::Sender::new(SessionState::UNRESOLVED),
            }),
        }
    }

    /// Create a store and resolve it from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn open(tab: Tab) -> Result<Self, StorageError> {
        let store = Self::new(tab);
        store.load()?;
        Ok(store)
    }

    /// Re-read the session from storage. Never writes.
    ///
    /// The login flag counts only when it is exactly `"true"`. A role name
    /// this build does not recognise loads as no role.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read; the in-memory state is
    /// left as it was.
    #[instrument(skip(self), fields(tab = %self.inner.tab.id()))]
    pub fn load(&self) -> Result<SessionState, StorageError> {
        let flag = self.inner.tab.get_item(keys::LOGGED_IN)?;
        let role_name = self.inner.tab.get_item(keys::ROLE)?;

        let status = if flag.as_deref() == Some(LOGGED_IN_FLAG) {
            LoginStatus::LoggedIn
        } else {
            LoginStatus::LoggedOut
        };
        let role = role_name
            .filter(|name| !name.is_empty())
            .and_then(|name| match name.parse::<Role>() {
                Ok(role) => Some(role),
                Err(e) => {
                    warn!(error = %e, "Ignoring unrecognised persisted role");
                    None
                }
            });

        let next = SessionState { status, role };
        self.inner
            .state
            .send_if_modified(|state| replace_if_changed(state, next));
        Ok(next)
    }

    /// Record a successful login. Defaults to [`Role::User`] when the backend
    /// did not report a role.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written; the in-memory state is
    /// left as it was.
    #[instrument(skip(self), fields(tab = %self.inner.tab.id()))]
    pub fn login(&self, role: Option<Role>) -> Result<SessionState, StorageError> {
        let role = role.unwrap_or_default();
        let tab = &self.inner.tab;

        tab.set_item(keys::LOGGED_IN, LOGGED_IN_FLAG)?;
        if let Err(e) = tab.set_item(keys::ROLE, role.as_str()) {
            // Don't leave a logged-in flag without its role behind.
            if let Err(rollback) = tab.remove_item(keys::LOGGED_IN) {
                warn!(error = %rollback, "Failed to roll back login flag");
            }
            return Err(e);
        }

        let next = SessionState::logged_in(Some(role));
        self.inner
            .state
            .send_if_modified(|state| replace_if_changed(state, next));
        info!(%role, "Logged in");
        Ok(next)
    }

    /// Forget the session.
    ///
    /// Removes the role before the login flag.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written; the in-memory state is
    /// re-read from storage so it matches whatever was removed.
    #[instrument(skip(self), fields(tab = %self.inner.tab.id()))]
    pub fn logout(&self) -> Result<(), StorageError> {
        let tab = &self.inner.tab;
        let removed = tab
            .remove_item(keys::ROLE)
            .and_then(|()| tab.remove_item(keys::LOGGED_IN));
        if let Err(e) = removed {
            if let Err(reload) = self.load() {
                warn!(error = %reload, "Failed to resync session after failed logout");
            }
            return Err(e);
        }

        self.inner
            .state
            .send_if_modified(|state| replace_if_changed(state, SessionState::LOGGED_OUT));
        info!("Logged out");
        Ok(())
    }

    /// Current session snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Receiver that is marked changed whenever the session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn tab(&self) -> &Tab {
        &self.inner.tab
    }
}

fn replace_if_changed(state: &mut SessionState, next: SessionState) -> bool {
    if *state == next {
        return false;
    }
    *state = next;
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::storage::{MemoryBackend, StorageArea, StorageBackend};

    /// Memory storage that refuses to delete one key.
    struct StuckKey {
        entries: MemoryBackend,
        key: &'static str,
    }

    impl StorageBackend for StuckKey {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.entries.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.entries.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            if key == self.key {
                return Err(StorageError::Unavailable(format!("{key} is read-only")));
            }
            self.entries.remove(key)
        }

        fn snapshot(&self) -> Result<BTreeMap<String, String>, StorageError> {
            self.entries.snapshot()
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(StorageArea::in_memory().open_tab())
    }

    #[test]
    fn test_new_store_is_unresolved() {
        assert_eq!(store().snapshot(), SessionState::UNRESOLVED);
    }

    #[test]
    fn test_load_empty_storage_is_logged_out() {
        let store = store();
        assert_eq!(store.load().unwrap(), SessionState::LOGGED_OUT);
        assert_eq!(store.snapshot().role_name(), "");
    }

    #[test]
    fn test_login_flag_must_be_exactly_true() {
        let store = store();
        for flag in ["TRUE", "1", "yes", " true"] {
            store.tab().set_item(keys::LOGGED_IN, flag).unwrap();
            assert_eq!(store.load().unwrap().status, LoginStatus::LoggedOut);
        }
        store.tab().set_item(keys::LOGGED_IN, "true").unwrap();
        assert_eq!(store.load().unwrap().status, LoginStatus::LoggedIn);
    }

    #[test]
    fn test_login_persists_and_defaults_role() {
        let store = store();
        let state = store.login(None).unwrap();

        assert_eq!(state, SessionState::logged_in(Some(Role::User)));
        assert_eq!(store.snapshot(), state);
        let tab = store.tab();
        assert_eq!(tab.get_item(keys::LOGGED_IN).unwrap().as_deref(), Some("true"));
        assert_eq!(tab.get_item(keys::ROLE).unwrap().as_deref(), Some("user"));
    }

    #[test]
    fn test_logout_clears_storage_and_state() {
        let store = store();
        store.login(Some(Role::Admin)).unwrap();
        store.logout().unwrap();

        let state = store.snapshot();
        assert!(!state.is_logged_in());
        assert_eq!(state.status, LoginStatus::LoggedOut);
        assert_eq!(state.role_name(), "");
        assert_eq!(store.tab().get_item(keys::LOGGED_IN).unwrap(), None);
        assert_eq!(store.tab().get_item(keys::ROLE).unwrap(), None);
    }

    #[test]
    fn test_unknown_persisted_role_loads_as_none() {
        let store = store();
        store.tab().set_item(keys::LOGGED_IN, "true").unwrap();
        store.tab().set_item(keys::ROLE, "superuser").unwrap();

        let state = store.load().unwrap();
        assert!(state.is_logged_in());
        assert_eq!(state.role, None);
    }

    #[test]
    fn test_load_never_writes() {
        let area = StorageArea::in_memory();
        let store = SessionStore::new(area.open_tab());
        let mut feed = area.open_tab().changes();

        store.load().unwrap();
        store.load().unwrap();
        assert_eq!(feed.try_recv(), None);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let store = store();
        store.tab().set_item(keys::LOGGED_IN, "true").unwrap();
        store.tab().set_item(keys::ROLE, "seller").unwrap();
        let mut rx = store.subscribe();

        store.load().unwrap();
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        store.load().unwrap();
        assert!(!rx.has_changed().unwrap());
        assert_eq!(store.snapshot(), SessionState::logged_in(Some(Role::Seller)));
    }

    #[test]
    fn test_failed_login_leaves_state_untouched() {
        let store = SessionStore::new(StorageArea::new(MemoryBackend::with_quota(4)).open_tab());
        store.load().unwrap();

        assert!(store.login(Some(Role::Admin)).is_err());
        assert_eq!(store.snapshot(), SessionState::LOGGED_OUT);
    }

    #[test]
    fn test_failed_role_write_rolls_back_flag() {
        // Room for the login flag but not the role as well.
        let store = SessionStore::new(StorageArea::new(MemoryBackend::with_quota(20)).open_tab());
        store.load().unwrap();

        assert!(store.login(Some(Role::Admin)).is_err());
        assert_eq!(store.tab().get_item(keys::LOGGED_IN).unwrap(), None);
        assert_eq!(store.load().unwrap(), SessionState::LOGGED_OUT);
    }

    #[test]
    fn test_failed_logout_keeps_memory_matching_storage() {
        for key in [keys::ROLE, keys::LOGGED_IN] {
            let area = StorageArea::new(StuckKey {
                entries: MemoryBackend::new(),
                key,
            });
            let store = SessionStore::new(area.open_tab());
            store.login(Some(Role::Seller)).unwrap();

            assert!(store.logout().is_err());
            let persisted = SessionStore::open(area.open_tab()).unwrap().snapshot();
            assert_eq!(store.snapshot(), persisted, "stuck key {key}");
        }
    }
}
