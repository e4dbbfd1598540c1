//! HTTP client module for the application API.
//!
//! This module provides the `ApiClient`, which attaches the stored session's
//! `Authorization` header to outgoing requests and sends cookies along, so
//! token-based and cookie-based sessions work through the same call.

pub mod client;
pub mod error;
pub mod request;

pub use client::{ApiClient, AuthResponse};
pub use error::ApiError;
pub use request::RequestInit;
