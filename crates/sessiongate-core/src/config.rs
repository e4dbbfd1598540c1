//! Client configuration.
//!
//! The API base URL comes from `SESSIONGATE_API_BASE`, read at runtime first
//! and otherwise baked in at build time. Trailing slashes are stripped once
//! here so request paths can be appended directly.

use std::env;

/// Environment variable naming the API host.
pub const API_BASE_ENV: &str = "SESSIONGATE_API_BASE";

/// Value of `SESSIONGATE_API_BASE` when the crate was compiled.
const BUILD_API_BASE: Option<&str> = option_env!("SESSIONGATE_API_BASE");

/// The storage key is not part of this; set it on `SessionStore::with_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    api_base: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(BUILD_API_BASE.unwrap_or_default())
    }
}

impl ClientConfig {
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: strip_trailing_slashes(api_base).to_string(),
        }
    }

    /// Runtime environment first, then the build-time value, then empty.
    pub fn from_env() -> Self {
        match env::var(API_BASE_ENV) {
            Ok(base) if !base.trim().is_empty() => Self::new(base.trim()),
            _ => Self::default(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

pub fn strip_trailing_slashes(base: &str) -> &str {
    base.trim_end_matches('/')
}
