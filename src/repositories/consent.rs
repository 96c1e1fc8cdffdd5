use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

/// Errors raised by a consent storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend cannot be reached or is blocked.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence port for the single consent slot.
///
/// Values are opaque, already-encoded strings. Backends are responsible for
/// honouring `max_age`; an expired value must read back as absent.
pub trait ConsentStorage {
    fn get(&self) -> Result<Option<String>, StorageError>;
    fn set(&self, value: &str, max_age: Duration) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Stores the consent record in a browser cookie.
///
/// The cookie is readable from page scripts (no `HttpOnly`), site-wide,
/// `SameSite=Lax`.
#[derive(Clone)]
pub struct CookieStorage {
    cookies: Cookies,
    name: String,
    secure: bool,
}

impl CookieStorage {
    /// Creates a new `CookieStorage`.
    ///
    /// # Arguments
    ///
    /// * `cookies` - The request's cookie jar.
    /// * `name` - The cookie name.
    /// * `secure` - Whether to restrict the cookie to secure transport.
    pub fn new(cookies: Cookies, name: impl Into<String>, secure: bool) -> Self {
        Self {
            cookies,
            name: name.into(),
            secure,
        }
    }
}

impl ConsentStorage for CookieStorage {
    fn get(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .cookies
            .get(&self.name)
            .map(|cookie| cookie.value().to_string()))
    }

    fn set(&self, value: &str, max_age: Duration) -> Result<(), StorageError> {
        let mut cookie = Cookie::new(self.name.clone(), value.to_string());
        cookie.set_path("/");
        cookie.set_same_site(SameSite::Lax);
        cookie.set_secure(self.secure);
        cookie.set_max_age(tower_cookies::cookie::time::Duration::seconds(
            max_age.num_seconds(),
        ));
        self.cookies.add(cookie);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut cookie = Cookie::new(self.name.clone(), "");
        cookie.set_max_age(tower_cookies::cookie::time::Duration::seconds(0));
        cookie.set_path("/");
        self.cookies.remove(cookie);
        Ok(())
    }
}

#[derive(Default)]
struct MemorySlot {
    value: Option<(String, DateTime<Utc>)>,
    unavailable: bool,
}

/// In-process consent slot. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<MemorySlot>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail, as a blocked backend would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Places a raw value in the slot, bypassing any encoding.
    pub fn seed(&self, value: impl Into<String>, expires_at: DateTime<Utc>) {
        self.lock().value = Some((value.into(), expires_at));
    }

    /// The raw value and its expiry, whether or not it has expired.
    pub fn peek(&self) -> Option<(String, DateTime<Utc>)> {
        self.lock().value.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemorySlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(slot: &MemorySlot) -> Result<(), StorageError> {
        if slot.unavailable {
            return Err(StorageError::Unavailable(
                "memory slot is blocked".to_string(),
            ));
        }
        Ok(())
    }
}

impl ConsentStorage for MemoryStorage {
    fn get(&self) -> Result<Option<String>, StorageError> {
        let mut slot = self.lock();
        Self::check(&slot)?;

        match slot.value.take() {
            Some((value, expires_at)) if expires_at > Utc::now() => {
                slot.value = Some((value.clone(), expires_at));
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    fn set(&self, value: &str, max_age: Duration) -> Result<(), StorageError> {
        let mut slot = self.lock();
        Self::check(&slot)?;
        slot.value = Some((value.to_string(), Utc::now() + max_age));
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut slot = self.lock();
        Self::check(&slot)?;
        slot.value = None;
        Ok(())
    }
}
