//! Browser-backed storage: `localStorage` for the durable scope,
//! `sessionStorage` for the tab scope. Requires a browser environment.

use super::{Result, Scope, SessionStorage, StorageError};

#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserStorage;

impl BrowserStorage {
    pub fn new() -> Self {
        Self
    }

    fn storage(scope: Scope) -> Result<web_sys::Storage> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        let storage = match scope {
            Scope::Durable => window.local_storage(),
            Scope::Tab => window.session_storage(),
        };
        storage
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable(format!("{} storage disabled", scope)))
    }
}

impl SessionStorage for BrowserStorage {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>> {
        Self::storage(scope)?
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<()> {
        Self::storage(scope)?
            .set_item(key, value)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn remove(&self, scope: Scope, key: &str) -> Result<()> {
        Self::storage(scope)?
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }
}
