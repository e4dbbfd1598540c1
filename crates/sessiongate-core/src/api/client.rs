//! Authenticated HTTP client for the application API.
//!
//! `fetch` attaches the stored session's credentials to a request and hands
//! back whatever the transport returns. The login/signup/me helpers sit on
//! top of it and are the only places that interpret status codes.

use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

#[cfg(not(target_arch = "wasm32"))]
use reqwest::cookie::Jar;

use crate::auth::{Clock, Session, SessionStore, SessionUser, SystemClock};
use crate::config::ClientConfig;
use crate::storage::SessionStorage;

use super::{ApiError, RequestInit};

/// HTTP request timeout in seconds.
#[cfg(not(target_arch = "wasm32"))]
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    remember: bool,
}

#[derive(Serialize)]
struct SignupRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Body of a successful `/auth/login` or `/auth/signup`.
///
/// `refreshToken` is ignored; the server also sets it as an http-only cookie.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: i64,
    pub user: Option<SessionUser>,
    pub message: Option<String>,
}

impl AuthResponse {
    pub fn into_session(self, now_ms: i64) -> Session {
        Session {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_at: expiry_after(now_ms, self.expires_in),
            user: self.user,
            session_cookie: None,
        }
    }
}

/// Absolute expiry `expires_in` seconds after `now_ms`. A lifetime too
/// large to represent is treated as open-ended.
fn expiry_after(now_ms: i64, expires_in: i64) -> Option<i64> {
    if expires_in <= 0 {
        return None;
    }
    expires_in
        .checked_mul(1000)
        .and_then(|ms| now_ms.checked_add(ms))
}

/// API client bound to a session store.
pub struct ApiClient<S, C = SystemClock> {
    client: Client,
    config: ClientConfig,
    store: Arc<SessionStore<S, C>>,
    #[cfg(not(target_arch = "wasm32"))]
    cookies: Arc<Jar>,
}

impl<S, C> Clone for ApiClient<S, C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            #[cfg(not(target_arch = "wasm32"))]
            cookies: Arc::clone(&self.cookies),
        }
    }
}

impl<S: SessionStorage, C: Clock> ApiClient<S, C> {
    /// Create a client. On native targets cookies set by the server are kept
    /// in a jar and sent back, the counterpart of `credentials: include`.
    pub fn new(config: ClientConfig, store: Arc<SessionStore<S, C>>) -> Result<Self, ApiError> {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let cookies = Arc::new(Jar::default());
            let client = Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .cookie_provider(Arc::clone(&cookies))
                .build()?;
            Ok(Self {
                client,
                config,
                store,
                cookies,
            })
        }
        #[cfg(target_arch = "wasm32")]
        {
            let client = Client::builder().build()?;
            Ok(Self {
                client,
                config,
                store,
            })
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore<S, C> {
        &self.store
    }

    /// Cookie jar shared by every request from this client.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn cookies(&self) -> &Arc<Jar> {
        &self.cookies
    }

    /// Build the request `fetch` would send, without sending it.
    ///
    /// Overwrites any caller-supplied `Authorization` header when the stored
    /// session has a token.
    pub fn prepare(&self, path: &str, init: RequestInit) -> Result<Request, ApiError> {
        let mut headers = init.headers;
        if let Some(value) = self.store.load().as_ref().and_then(Session::authorization) {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&value)?);
        }

        let mut builder = self
            .client
            .request(init.method, self.config.url(path))
            .headers(headers);
        if let Some(body) = init.body {
            builder = builder.body(body);
        }
        #[cfg(target_arch = "wasm32")]
        {
            builder = builder.fetch_credentials_include();
        }

        Ok(builder.build()?)
    }

    /// Send an authenticated request to `path` under the API base.
    ///
    /// The response comes back as-is whatever its status; transport failures
    /// surface as `ApiError::Network`.
    pub async fn fetch(&self, path: &str, init: RequestInit) -> Result<Response, ApiError> {
        let request = self.prepare(path, init)?;
        debug!(method = %request.method(), url = %request.url(), "API request");
        Ok(self.client.execute(request).await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn establish(&self, path: &str, init: RequestInit, remember: bool) -> Result<Session, ApiError> {
        let response = self.fetch(path, init).await?;
        let auth: AuthResponse = Self::parse(response).await?;
        if let Some(ref message) = auth.message {
            debug!(message = %message, "Auth response");
        }

        let session = auth.into_session(self.store.clock().now_millis());
        self.store.save(&session, remember)?;
        info!(remember, "Session established");
        Ok(session)
    }

    /// Log in and persist the resulting session, durable if `remember`.
    pub async fn login(&self, email: &str, password: &str, remember: bool) -> Result<Session, ApiError> {
        let init = RequestInit::post().json(&LoginRequest {
            email,
            password,
            remember,
        })?;
        self.establish("/auth/login", init, remember).await
    }

    /// Create an account. New accounts are always remembered.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<Session, ApiError> {
        let init = RequestInit::post().json(&SignupRequest {
            name,
            email,
            password,
        })?;
        self.establish("/auth/signup", init, true).await
    }

    /// The user the server associates with the current credentials.
    pub async fn current_user(&self) -> Result<SessionUser, ApiError> {
        let response = self.fetch("/auth/me", RequestInit::get()).await?;
        Self::parse(response).await
    }

    /// Forget the local session. The server is not contacted.
    pub fn logout(&self) {
        self.store.clear();
    }
}
