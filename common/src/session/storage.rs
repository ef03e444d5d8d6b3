// common/src/session/storage.rs
use actix_web::cookie::time::OffsetDateTime;
use actix_web::cookie::{Cookie, CookieJar};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded writing '{0}'")]
    QuotaExceeded(String),
}

/// Key/value client storage that survives a reload (the browser's local storage)
pub trait ClientStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Cookie sink readable by server-side request handling
pub trait CookieStore: Send + Sync {
    fn set_cookie(&self, cookie: Cookie<'static>) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory storage; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClientStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// In-memory cookie jar; keeps the live cookies plus the last header written per name
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieJar {
    inner: Arc<Mutex<JarState>>,
}

#[derive(Debug, Default)]
struct JarState {
    jar: CookieJar,
    last_written: HashMap<String, String>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a cookie that is still live
    pub fn value(&self, name: &str) -> Option<String> {
        lock(&self.inner).jar.get(name).map(|c| c.value().to_string())
    }

    /// The last `Set-Cookie` string written for `name`
    pub fn last_written(&self, name: &str) -> Option<String> {
        lock(&self.inner).last_written.get(name).cloned()
    }
}

fn is_expired(cookie: &Cookie<'_>) -> bool {
    if cookie.max_age().map_or(false, |age| age.is_zero() || age.is_negative()) {
        return true;
    }
    cookie
        .expires_datetime()
        .map_or(false, |at| at <= OffsetDateTime::now_utc())
}

impl CookieStore for MemoryCookieJar {
    fn set_cookie(&self, cookie: Cookie<'static>) -> Result<(), StorageError> {
        let mut state = lock(&self.inner);
        state
            .last_written
            .insert(cookie.name().to_string(), cookie.to_string());

        if is_expired(&cookie) {
            if let Some(existing) = state.jar.get(cookie.name()).cloned() {
                state.jar.force_remove(&existing);
            }
        } else {
            state.jar.add_original(cookie);
        }
        Ok(())
    }
}
