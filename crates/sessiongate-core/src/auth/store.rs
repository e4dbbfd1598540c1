use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::session::Session;
use crate::storage::{Scope, SessionStorage, StorageError};

/// Storage key holding the serialized session in either scope.
pub const DEFAULT_STORAGE_KEY: &str = "auth_session";

/// A loaded session tagged with the scope it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub session: Session,
    pub scope: Scope,
}

/// Owns the single persisted session across both storage scopes.
///
/// At most one scope holds the record: `save` vacates the other scope before
/// writing. Reads never fail; anything unreadable is reported as no session.
pub struct SessionStore<S, C = SystemClock> {
    storage: S,
    clock: C,
    key: String,
}

impl<S: SessionStorage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: SessionStorage, C: Clock> SessionStore<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self {
            storage,
            clock,
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Use a storage key other than `auth_session`.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn read(&self, scope: Scope) -> Option<Session> {
        let raw = match self.storage.get(scope, &self.key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return None,
            Err(e) => {
                warn!(%scope, error = %e, "Failed to read session storage");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                debug!(%scope, error = %e, "Ignoring unparsable stored session");
                None
            }
        }
    }

    /// Load the session, durable scope first, with the scope it came from.
    pub fn load_scoped(&self) -> Option<StoredSession> {
        [Scope::Durable, Scope::Tab].into_iter().find_map(|scope| {
            self.read(scope)
                .map(|session| StoredSession { session, scope })
        })
    }

    /// Load the session, durable scope first.
    pub fn load(&self) -> Option<Session> {
        self.load_scoped().map(|stored| stored.session)
    }

    /// Persist `session` in the durable scope if `remember`, else the tab scope.
    /// The other scope is cleared first.
    pub fn save(&self, session: &Session, remember: bool) -> Result<(), StorageError> {
        let target = Scope::for_remember(remember);
        let raw = serde_json::to_string(session)
            .map_err(|e| StorageError::Unavailable(format!("failed to encode session: {}", e)))?;

        self.storage.remove(target.other(), &self.key)?;
        self.storage.set(target, &self.key, &raw)?;
        info!(scope = %target, "Saved session");
        Ok(())
    }

    /// Remove the session from both scopes. Safe to call with no session.
    pub fn clear(&self) {
        for scope in [Scope::Durable, Scope::Tab] {
            if let Err(e) = self.storage.remove(scope, &self.key) {
                warn!(%scope, error = %e, "Failed to remove stored session");
            }
        }
        info!("Cleared session");
    }

    /// Access token of the stored session, if any.
    pub fn access_token(&self) -> Option<String> {
        self.load().and_then(|s| s.token().map(str::to_string))
    }

    /// Whether the stored session grants access.
    ///
    /// Side effect: a session past its `expires_at` is cleared from storage
    /// the first time it is checked, then reported as not authenticated.
    pub fn is_authenticated(&self) -> bool {
        let Some(session) = self.load() else {
            return false;
        };

        if session.is_expired_at(self.clock.now_millis()) {
            debug!(expires_at = ?session.expires_at, "Session expired, evicting");
            self.clear();
            return false;
        }

        session.has_credentials()
    }

    /// Same as `is_authenticated`, named for call sites that want the
    /// eviction side effect visible.
    pub fn check_and_evict(&self) -> bool {
        self.is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::FixedClock;
    use crate::auth::session::{SessionUser, UserId};
    use crate::storage::MemoryStorage;
    use std::sync::Mutex;

    const NOW: i64 = 1_700_000_000_000;

    /// Storage whose reads fail, and whose removals fail in one scope.
    #[derive(Default)]
    struct BrokenStorage {
        inner: MemoryStorage,
        fail_get: bool,
        fail_remove: Option<Scope>,
        removals: Mutex<Vec<Scope>>,
    }

    impl SessionStorage for BrokenStorage {
        fn get(&self, scope: Scope, key: &str) -> crate::storage::Result<Option<String>> {
            if self.fail_get {
                return Err(StorageError::Unavailable("security error".to_string()));
            }
            self.inner.get(scope, key)
        }

        fn set(&self, scope: Scope, key: &str, value: &str) -> crate::storage::Result<()> {
            self.inner.set(scope, key, value)
        }

        fn remove(&self, scope: Scope, key: &str) -> crate::storage::Result<()> {
            self.removals.lock().unwrap().push(scope);
            if self.fail_remove == Some(scope) {
                return Err(StorageError::Unavailable("quota".to_string()));
            }
            self.inner.remove(scope, key)
        }
    }

    fn store() -> SessionStore<MemoryStorage, FixedClock> {
        SessionStore::with_clock(MemoryStorage::new(), FixedClock(NOW))
    }

    fn full_session() -> Session {
        Session {
            access_token: Some("abc".to_string()),
            token_type: Some("Bearer".to_string()),
            expires_at: Some(NOW + 60_000),
            user: Some(SessionUser {
                id: Some(UserId::Number(1)),
                name: Some("Kim".to_string()),
                email: Some("kim@example.com".to_string()),
            }),
            session_cookie: Some(false),
        }
    }

    #[test]
    fn test_remembered_save_round_trips_and_vacates_tab_scope() {
        let store = store();
        store.storage().set(Scope::Tab, DEFAULT_STORAGE_KEY, "{}").unwrap();

        let session = full_session();
        store.save(&session, true).unwrap();

        assert_eq!(store.load(), Some(session));
        assert_eq!(store.storage().get(Scope::Tab, DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_unremembered_save_vacates_durable_scope() {
        let store = store();
        store.save(&full_session(), true).unwrap();
        store.save(&Session::with_token("tab"), false).unwrap();

        assert_eq!(store.storage().get(Scope::Durable, DEFAULT_STORAGE_KEY).unwrap(), None);
        let stored = store.load_scoped().unwrap();
        assert_eq!(stored.scope, Scope::Tab);
        assert_eq!(stored.session.token(), Some("tab"));
    }

    #[test]
    fn test_durable_scope_wins_over_tab_scope() {
        let store = store();
        store.storage().set(Scope::Durable, DEFAULT_STORAGE_KEY, r#"{"accessToken":"d"}"#).unwrap();
        store.storage().set(Scope::Tab, DEFAULT_STORAGE_KEY, r#"{"accessToken":"t"}"#).unwrap();

        assert_eq!(store.access_token().as_deref(), Some("d"));
    }

    #[test]
    fn test_unparsable_durable_value_falls_through_to_tab() {
        let store = store();
        store.storage().set(Scope::Durable, DEFAULT_STORAGE_KEY, "not json").unwrap();
        store.storage().set(Scope::Tab, DEFAULT_STORAGE_KEY, r#"{"accessToken":"t"}"#).unwrap();

        let stored = store.load_scoped().unwrap();
        assert_eq!(stored.scope, Scope::Tab);
    }

    #[test]
    fn test_malformed_or_empty_values_read_as_absent() {
        let store = store();
        store.storage().set(Scope::Durable, DEFAULT_STORAGE_KEY, "[1, 2").unwrap();
        store.storage().set(Scope::Tab, DEFAULT_STORAGE_KEY, "").unwrap();

        assert_eq!(store.load(), None);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_clear_then_load_is_absent() {
        let store = store();
        store.clear();
        assert_eq!(store.load(), None);

        store.save(&full_session(), true).unwrap();
        store.storage().set(Scope::Tab, DEFAULT_STORAGE_KEY, r#"{"accessToken":"t"}"#).unwrap();
        store.clear();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_custom_key() {
        let store = store().with_key("other_key");
        store.save(&Session::with_token("abc"), true).unwrap();

        assert!(store.storage().get(Scope::Durable, "other_key").unwrap().is_some());
        assert_eq!(store.storage().get(Scope::Durable, DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_access_token_projection() {
        let store = store();
        assert_eq!(store.access_token(), None);

        store.save(&Session::cookie_only(), false).unwrap();
        assert_eq!(store.access_token(), None);

        store.save(&Session::with_token("abc"), false).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_expired_session_is_evicted_on_check() {
        let store = store();
        let mut session = full_session();
        session.expires_at = Some(NOW - 1);
        store.save(&session, true).unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(store.load(), None);
        assert_eq!(store.storage().get(Scope::Durable, DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_session_expiring_now_is_still_valid() {
        let store = store();
        let mut session = full_session();
        session.expires_at = Some(NOW);
        store.save(&session, false).unwrap();

        assert!(store.check_and_evict());
        assert!(store.load().is_some());
    }

    #[test]
    fn test_zero_expiry_is_never_evicted() {
        let store = store();
        let mut session = Session::with_token("abc");
        session.expires_at = Some(0);
        store.save(&session, true).unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.load(), Some(session));
    }

    #[test]
    fn test_unreadable_storage_reads_as_logged_out() {
        let storage = BrokenStorage {
            fail_get: true,
            ..BrokenStorage::default()
        };
        storage
            .inner
            .set(Scope::Durable, DEFAULT_STORAGE_KEY, r#"{"accessToken":"abc"}"#)
            .unwrap();
        let store = SessionStore::with_clock(storage, FixedClock(NOW));

        assert_eq!(store.load(), None);
        assert_eq!(store.load_scoped(), None);
        assert_eq!(store.access_token(), None);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_clear_continues_past_failing_scope() {
        let storage = BrokenStorage {
            fail_remove: Some(Scope::Durable),
            ..BrokenStorage::default()
        };
        storage
            .inner
            .set(Scope::Tab, DEFAULT_STORAGE_KEY, r#"{"accessToken":"abc"}"#)
            .unwrap();
        let store = SessionStore::with_clock(storage, FixedClock(NOW));

        store.clear();

        assert_eq!(*store.storage().removals.lock().unwrap(), vec![Scope::Durable, Scope::Tab]);
        assert_eq!(store.storage().inner.get(Scope::Tab, DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_save_surfaces_storage_failure() {
        let storage = BrokenStorage {
            fail_remove: Some(Scope::Tab),
            ..BrokenStorage::default()
        };
        let store = SessionStore::with_clock(storage, FixedClock(NOW));

        assert!(matches!(
            store.save(&Session::with_token("abc"), true),
            Err(StorageError::Unavailable(_))
        ));
    }

    #[test]
    fn test_cookie_only_session_without_expiry_is_authenticated() {
        let store = store();
        store.save(&Session::cookie_only(), true).unwrap();
        assert!(store.is_authenticated());
    }

    #[test]
    fn test_session_without_credentials_is_not_authenticated() {
        let store = store();
        let session = Session {
            user: full_session().user,
            session_cookie: Some(false),
            ..Session::default()
        };
        store.save(&session, true).unwrap();

        assert!(!store.is_authenticated());
        // Not expired, so nothing is evicted.
        assert!(store.load().is_some());
    }
}
