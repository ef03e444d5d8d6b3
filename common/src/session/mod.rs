// common/src/session/mod.rs
//! Client-side session bootstrap.
//!
//! A [`SessionProvider`] is owned by the application shell for its whole
//! lifetime. It hydrates a [`SessionStore`] once from [`ClientStorage`] and
//! hands out [`SessionContext`]s; components reach the store through
//! [`SessionContext::use_session`], which fails once the provider is gone.
pub mod storage;

use actix_web::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use actix_web::cookie::{Cookie, SameSite};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use thiserror::Error;

use crate::models::session::{PersistReport, PersistTarget, Session, SessionPhase};
pub use storage::{ClientStorage, CookieStore, MemoryCookieJar, MemoryStorage, StorageError};

/// Storage key holding the serialized user
pub const USER_KEY: &str = "user";
/// Storage key holding the raw bearer token
pub const TOKEN_KEY: &str = "token";
/// Cookie mirrored for server-side gating
pub const TOKEN_COOKIE_NAME: &str = "token";
/// Cookie max age in seconds (24 hours)
pub const TOKEN_COOKIE_MAX_AGE: i64 = 86400;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session accessed outside of an active SessionProvider")]
    OutsideProvider,
    #[error("session used before hydration completed")]
    NotHydrated,
}

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    user: Option<Value>,
    token: Option<String>,
}

/// Single source of truth for the signed-in user and their token
pub struct SessionStore {
    state: RwLock<SessionState>,
    // Held across memory and persistence writes so sign-in and logout never interleave
    persist: Mutex<()>,
    storage: Arc<dyn ClientStorage>,
    cookies: Arc<dyn CookieStore>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn ClientStorage>, cookies: Arc<dyn CookieStore>) -> Self {
        Self {
            state: RwLock::new(SessionState {
                phase: SessionPhase::Uninitialized,
                user: None,
                token: None,
            }),
            persist: Mutex::new(()),
            storage,
            cookies,
        }
    }

    /// Read the persisted session once. Returns false if hydration already ran.
    pub fn hydrate(&self) -> bool {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.phase != SessionPhase::Uninitialized {
                return false;
            }
            state.phase = SessionPhase::Hydrating;
        }

        let persisted = self.read_persisted();

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        // A logout that raced the read already settled the phase
        if state.phase != SessionPhase::Hydrating {
            return false;
        }
        match persisted {
            Some((user, token)) => {
                tracing::info!("Restored persisted session");
                state.user = Some(user);
                state.token = Some(token);
                state.phase = SessionPhase::HydratedAuthenticated;
            },
            None => {
                tracing::debug!("No persisted session found");
                state.phase = SessionPhase::HydratedEmpty;
            }
        }
        true
    }

    fn read_persisted(&self) -> Option<(Value, String)> {
        let user = match self.storage.get_item(USER_KEY) {
            Ok(user) => user?,
            Err(e) => {
                tracing::warn!("Failed to read persisted user: {}", e);
                return None;
            }
        };
        let token = match self.storage.get_item(TOKEN_KEY) {
            Ok(token) => token?,
            Err(e) => {
                tracing::warn!("Failed to read persisted token: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<Value>(&user) {
            Ok(user) => Some((user, token)),
            Err(e) => {
                tracing::warn!("Ignoring malformed persisted user: {}", e);
                None
            }
        }
    }

    /// Sign in: memory first, then storage, then the cookie.
    /// Persistence failures are logged and reported, never rolled back.
    pub fn set_auth(&self, user: Value, token: impl Into<String>) -> Result<PersistReport, SessionError> {
        let token = token.into();
        let _persist = self.persist.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if !state.phase.is_hydrated() {
                return Err(SessionError::NotHydrated);
            }
            state.user = Some(user.clone());
            state.token = Some(token.clone());
            state.phase = SessionPhase::HydratedAuthenticated;
        }

        let mut report = PersistReport::default();

        let user_write = serde_json::to_string(&user)
            .map_err(|e| StorageError::Unavailable(e.to_string()))
            .and_then(|json| self.storage.set_item(USER_KEY, &json));
        self.record(&mut report, PersistTarget::UserEntry, user_write);

        let token_write = self.storage.set_item(TOKEN_KEY, &token);
        self.record(&mut report, PersistTarget::TokenEntry, token_write);

        let cookie_write = self.cookies.set_cookie(token_cookie(token));
        self.record(&mut report, PersistTarget::Cookie, cookie_write);

        Ok(report)
    }

    /// Sign out from any phase. Safe to call repeatedly.
    pub fn logout(&self) -> PersistReport {
        let _persist = self.persist.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.user = None;
            state.token = None;
            state.phase = SessionPhase::HydratedEmpty;
        }

        let mut report = PersistReport::default();

        let user_remove = self.storage.remove_item(USER_KEY);
        self.record(&mut report, PersistTarget::UserEntry, user_remove);

        let token_remove = self.storage.remove_item(TOKEN_KEY);
        self.record(&mut report, PersistTarget::TokenEntry, token_remove);

        let cookie_clear = self.cookies.set_cookie(expired_token_cookie());
        self.record(&mut report, PersistTarget::Cookie, cookie_clear);

        report
    }

    fn record(&self, report: &mut PersistReport, target: PersistTarget, result: Result<(), StorageError>) {
        if let Err(e) = result {
            tracing::warn!("Failed to persist {}: {}", target, e);
            report.failed.push(target);
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.read().unwrap_or_else(PoisonError::into_inner).phase
    }

    pub fn is_hydrated(&self) -> bool {
        self.phase().is_hydrated()
    }

    pub fn snapshot(&self) -> Session {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Session {
            user: state.user.clone(),
            token: state.token.clone(),
            hydrated: state.phase.is_hydrated(),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).token.clone()
    }

    /// `Authorization` value for gateway calls, only once hydrated and signed in
    pub fn bearer(&self) -> Option<String> {
        let session = self.snapshot();
        if !session.is_authenticated() {
            return None;
        }
        session.token.map(|token| format!("Bearer {}", token))
    }
}

fn token_cookie(token: String) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE_NAME, token)
        .path("/")
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(TOKEN_COOKIE_MAX_AGE))
        .finish()
}

fn expired_token_cookie() -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE_NAME, "")
        .path("/")
        .expires(OffsetDateTime::UNIX_EPOCH)
        .finish()
}

/// Owns the session store for the lifetime of the application shell
pub struct SessionProvider {
    store: Arc<SessionStore>,
}

impl SessionProvider {
    /// Create the store and run hydration
    pub fn mount(storage: Arc<dyn ClientStorage>, cookies: Arc<dyn CookieStore>) -> Self {
        let store = Arc::new(SessionStore::new(storage, cookies));
        store.hydrate();
        tracing::info!("Session provider mounted (phase: {:?})", store.phase());
        Self { store }
    }

    pub fn context(&self) -> SessionContext {
        SessionContext {
            store: Arc::downgrade(&self.store),
        }
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        tracing::debug!("Session provider unmounted");
    }
}

/// Handle given to components nested under a provider
#[derive(Clone, Default)]
pub struct SessionContext {
    store: Weak<SessionStore>,
}

impl SessionContext {
    /// A context with no provider above it
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn use_session(&self) -> Result<Arc<SessionStore>, SessionError> {
        self.store.upgrade().ok_or(SessionError::OutsideProvider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;
    use std::time::Duration;

    struct FailingStorage;

    impl ClientStorage for FailingStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("private mode".into()))
        }

        fn set_item(&self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::QuotaExceeded(key.to_string()))
        }

        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("private mode".into()))
        }
    }

    /// Storage whose writes take long enough for another thread to interleave
    struct SlowStorage {
        inner: MemoryStorage,
        delay: Duration,
    }

    impl ClientStorage for SlowStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            thread::sleep(self.delay);
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove_item(key)
        }
    }

    fn mount(storage: &MemoryStorage, jar: &MemoryCookieJar) -> SessionProvider {
        SessionProvider::mount(Arc::new(storage.clone()), Arc::new(jar.clone()))
    }

    fn inspector() -> Value {
        json!({ "id": 7, "email": "inspector@roads.example", "role": "inspector" })
    }

    #[test]
    fn test_hydrates_empty_without_persisted_data() {
        let provider = mount(&MemoryStorage::new(), &MemoryCookieJar::new());
        let session = provider.context().use_session().unwrap().snapshot();

        assert!(session.hydrated);
        assert_eq!(session.user, None);
        assert_eq!(session.token, None);
    }

    #[test]
    fn test_hydration_runs_once() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryCookieJar::new()));
        assert_eq!(store.phase(), SessionPhase::Uninitialized);
        assert!(!store.is_hydrated());

        assert!(store.hydrate());
        assert_eq!(store.phase(), SessionPhase::HydratedEmpty);
        assert!(!store.hydrate());
    }

    #[test]
    fn test_set_auth_is_visible_immediately() {
        let storage = MemoryStorage::new();
        let jar = MemoryCookieJar::new();
        let provider = mount(&storage, &jar);
        let store = provider.context().use_session().unwrap();

        let report = store.set_auth(inspector(), "tok-123").unwrap();
        assert!(report.is_complete());

        let session = store.snapshot();
        assert_eq!(session.user, Some(inspector()));
        assert_eq!(session.token.as_deref(), Some("tok-123"));
        assert_eq!(store.phase(), SessionPhase::HydratedAuthenticated);
        assert_eq!(store.bearer().as_deref(), Some("Bearer tok-123"));

        assert_eq!(storage.get_item(TOKEN_KEY).unwrap().as_deref(), Some("tok-123"));
        let persisted_user: Value = serde_json::from_str(&storage.get_item(USER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted_user, inspector());

        assert_eq!(jar.value(TOKEN_COOKIE_NAME).as_deref(), Some("tok-123"));
        let header = jar.last_written(TOKEN_COOKIE_NAME).unwrap();
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=86400"));
        assert!(header.contains("SameSite=Strict"));
    }

    #[test]
    fn test_reload_restores_session() {
        let storage = MemoryStorage::new();
        let jar = MemoryCookieJar::new();
        {
            let provider = mount(&storage, &jar);
            provider
                .context()
                .use_session()
                .unwrap()
                .set_auth(inspector(), "tok-abc")
                .unwrap();
        }

        let reloaded = mount(&storage, &jar);
        let session = reloaded.context().use_session().unwrap().snapshot();
        assert!(session.hydrated);
        assert_eq!(session.user, Some(inspector()));
        assert_eq!(session.token.as_deref(), Some("tok-abc"));
    }

    #[test]
    fn test_partial_persistence_does_not_require_both_entries() {
        let storage = MemoryStorage::new();
        storage.set_item(TOKEN_KEY, "orphan").unwrap();

        let provider = mount(&storage, &MemoryCookieJar::new());
        let session = provider.context().use_session().unwrap().snapshot();
        assert!(session.hydrated);
        assert_eq!(session.token, None);
    }

    #[test]
    fn test_malformed_user_hydrates_empty() {
        let storage = MemoryStorage::new();
        storage.set_item(USER_KEY, "{not json").unwrap();
        storage.set_item(TOKEN_KEY, "tok").unwrap();

        let provider = mount(&storage, &MemoryCookieJar::new());
        let store = provider.context().use_session().unwrap();
        assert_eq!(store.phase(), SessionPhase::HydratedEmpty);
    }

    #[test]
    fn test_logout_clears_everything_and_is_idempotent() {
        let storage = MemoryStorage::new();
        let jar = MemoryCookieJar::new();
        let provider = mount(&storage, &jar);
        let store = provider.context().use_session().unwrap();

        store.set_auth(inspector(), "tok-123").unwrap();
        assert!(store.logout().is_complete());

        let session = store.snapshot();
        assert_eq!(session.user, None);
        assert_eq!(session.token, None);
        assert!(session.hydrated);
        assert!(storage.is_empty());
        assert_eq!(jar.value(TOKEN_COOKIE_NAME), None);
        assert!(jar.last_written(TOKEN_COOKIE_NAME).unwrap().contains("Expires=Thu, 01 Jan 1970"));

        assert!(store.logout().is_complete());
        assert_eq!(store.snapshot(), session);
        assert_eq!(store.bearer(), None);
    }

    #[test]
    fn test_set_auth_before_hydration_is_rejected() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryCookieJar::new()));
        assert_eq!(store.set_auth(inspector(), "tok"), Err(SessionError::NotHydrated));
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_logout_before_hydration_settles_empty() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryCookieJar::new()));
        store.logout();
        assert_eq!(store.phase(), SessionPhase::HydratedEmpty);
        assert!(!store.hydrate());
    }

    #[test]
    fn test_failed_storage_writes_do_not_roll_back() {
        let jar = MemoryCookieJar::new();
        let provider = SessionProvider::mount(Arc::new(FailingStorage), Arc::new(jar.clone()));
        let store = provider.context().use_session().unwrap();
        assert!(store.is_hydrated());

        let report = store.set_auth(inspector(), "tok-9").unwrap();
        assert!(report.has_failed(PersistTarget::UserEntry));
        assert!(report.has_failed(PersistTarget::TokenEntry));
        assert!(!report.has_failed(PersistTarget::Cookie));

        assert_eq!(store.token().as_deref(), Some("tok-9"));
        assert_eq!(jar.value(TOKEN_COOKIE_NAME).as_deref(), Some("tok-9"));
    }

    #[test]
    fn test_use_session_outside_provider_fails() {
        assert!(matches!(
            SessionContext::detached().use_session(),
            Err(SessionError::OutsideProvider)
        ));

        let provider = mount(&MemoryStorage::new(), &MemoryCookieJar::new());
        let context = provider.context();
        assert!(context.use_session().is_ok());

        drop(provider);
        assert!(matches!(context.use_session(), Err(SessionError::OutsideProvider)));
    }

    #[test]
    fn test_logout_during_sign_in_leaves_nothing_persisted() {
        let storage = MemoryStorage::new();
        let jar = MemoryCookieJar::new();
        let slow = SlowStorage {
            inner: storage.clone(),
            delay: Duration::from_millis(100),
        };
        let provider = SessionProvider::mount(Arc::new(slow), Arc::new(jar.clone()));
        let store = provider.context().use_session().unwrap();

        let signing_in = {
            let store = store.clone();
            thread::spawn(move || store.set_auth(inspector(), "tok-race").unwrap())
        };
        thread::sleep(Duration::from_millis(30));
        store.logout();
        signing_in.join().unwrap();

        assert_eq!(store.token(), None);
        assert_eq!(storage.get_item(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get_item(USER_KEY).unwrap(), None);
        assert_eq!(jar.value(TOKEN_COOKIE_NAME), None);

        drop(provider);
        let reloaded = mount(&storage, &jar);
        assert_eq!(reloaded.context().use_session().unwrap().token(), None);
    }
}
