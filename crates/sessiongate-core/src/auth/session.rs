use serde::{Deserialize, Serialize};

/// Scheme used for the `Authorization` header when a session names none.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// User identifier as the server sends it: a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

/// Identity shown in the UI. Never consulted for access decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The persisted authentication record.
///
/// Stored as plain JSON with camelCase keys so a JavaScript front end sharing
/// the same storage key reads the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Absolute expiry, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    /// The server also set a same-origin cookie the transport sends on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<bool>,
}

impl Session {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn cookie_only() -> Self {
        Self {
            session_cookie: Some(true),
            ..Self::default()
        }
    }

    /// Access token, treating an empty string as absent.
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn token_type(&self) -> &str {
        self.token_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TOKEN_TYPE)
    }

    pub fn has_session_cookie(&self) -> bool {
        self.session_cookie.unwrap_or(false)
    }

    /// A session with neither a token nor a cookie is as good as none.
    pub fn has_credentials(&self) -> bool {
        self.token().is_some() || self.has_session_cookie()
    }

    /// Expiry timestamp, treating `0` as unset.
    pub fn expiry(&self) -> Option<i64> {
        self.expires_at.filter(|&expiry| expiry != 0)
    }

    /// Expired once the clock is strictly past `expires_at`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expiry().map(|expiry| now_ms > expiry).unwrap_or(false)
    }

    /// `Authorization` header value, if there is a token to send.
    pub fn authorization(&self) -> Option<String> {
        self.token()
            .map(|token| format!("{} {}", self.token_type(), token))
    }

    /// Milliseconds left before expiry (0 once expired), `None` if open-ended.
    pub fn millis_until_expiry(&self, now_ms: i64) -> Option<i64> {
        self.expiry().map(|expiry| expiry.saturating_sub(now_ms).max(0))
    }
}
