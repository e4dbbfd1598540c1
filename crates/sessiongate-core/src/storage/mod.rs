//! Key-value storage capability backing the session store.
//!
//! Storage is split into two independently selectable scopes:
//! - `Scope::Durable`: survives restarts ("remember me")
//! - `Scope::Tab`: lives only as long as the current browsing context or process
//!
//! Backends:
//! - `MemoryStorage`: in-memory maps, used by tests and embedders
//! - `FileStorage`: durable scope on disk, tab scope in process memory
//! - `BrowserStorage` (feature `web`): `localStorage` / `sessionStorage`

pub mod error;
pub mod file;
pub mod memory;

#[cfg(feature = "web")]
pub mod browser;

use std::fmt;

pub use error::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;

#[cfg(feature = "web")]
pub use browser::BrowserStorage;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Persistence scope for a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Durable,
    Tab,
}

impl Scope {
    /// The scope a save must vacate to keep a single session.
    pub fn other(self) -> Self {
        match self {
            Scope::Durable => Scope::Tab,
            Scope::Tab => Scope::Durable,
        }
    }

    pub fn for_remember(remember: bool) -> Self {
        if remember {
            Scope::Durable
        } else {
            Scope::Tab
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Durable => write!(f, "durable"),
            Scope::Tab => write!(f, "tab"),
        }
    }
}

/// String key-value storage with two scopes.
///
/// Every operation is a single-key read, replace or delete. Removing a
/// missing key is not an error.
pub trait SessionStorage {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>>;

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<()>;

    fn remove(&self, scope: Scope, key: &str) -> Result<()>;
}

impl<S: SessionStorage + ?Sized> SessionStorage for &S {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>> {
        (**self).get(scope, key)
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<()> {
        (**self).set(scope, key, value)
    }

    fn remove(&self, scope: Scope, key: &str) -> Result<()> {
        (**self).remove(scope, key)
    }
}
