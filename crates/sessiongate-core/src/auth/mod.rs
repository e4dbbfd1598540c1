//! Authentication module for the persisted client session.
//!
//! This module provides:
//! - `Session`: the stored record (token, scheme, expiry, user, cookie flag)
//! - `SessionStore`: load/save/clear across two storage scopes, plus the
//!   `is_authenticated` predicate that evicts expired sessions
//! - `Clock`: time source, swappable in tests

pub mod clock;
pub mod session;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use session::{Session, SessionUser, UserId, DEFAULT_TOKEN_TYPE};
pub use store::{SessionStore, StoredSession, DEFAULT_STORAGE_KEY};
