//! Client-side session management.
//!
//! - `storage`: two-scope key-value storage capability and its backends
//! - `auth`: the persisted `Session`, `SessionStore` and the authentication predicate
//! - `guard`: route table and the navigation guard run before each transition
//! - `api`: HTTP client that attaches the session's credentials
//! - `config`: API base URL

pub mod api;
pub mod auth;
pub mod config;
pub mod guard;
pub mod storage;

pub use api::{ApiClient, ApiError, RequestInit};
pub use auth::{Clock, Session, SessionStore, SessionUser, StoredSession, SystemClock};
pub use config::ClientConfig;
pub use guard::{decide, GuardDecision, GuardError, Navigation, NavigationGuard, Redirect, RouteRecord, RouteTable};
pub use storage::{FileStorage, MemoryStorage, Scope, SessionStorage, StorageError};

#[cfg(feature = "web")]
pub use storage::BrowserStorage;
