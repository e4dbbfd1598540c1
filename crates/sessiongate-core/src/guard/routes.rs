use std::collections::BTreeMap;

use url::Url;

use super::GuardError;

/// Origin used to resolve app-relative locations. Never contacted.
const APP_ORIGIN: &str = "http://app.invalid/";

/// A declared route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    pub name: String,
    pub path: String,
    pub requires_auth: bool,
}

impl RouteRecord {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            requires_auth: false,
        }
    }

    pub fn requires_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Non-strict match: ignores a trailing slash and ASCII case.
    fn matches(&self, path: &str) -> bool {
        normalize(&self.path).eq_ignore_ascii_case(normalize(path))
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Route a navigation is heading to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub name: Option<String>,
    pub path: String,
    /// Path plus query and fragment, as requested.
    pub full_path: String,
    pub query: BTreeMap<String, String>,
    pub requires_auth: bool,
}

impl RouteTarget {
    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

/// Outcome of looking a location up in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRoute {
    Matched(RouteTarget),
    /// The catch-all entry sent the location elsewhere.
    Redirect(String),
}

/// Declared routes plus the login and home routes the guard redirects to.
#[derive(Debug, Clone)]
pub struct RouteTable {
    records: Vec<RouteRecord>,
    fallback: Option<String>,
    login: usize,
    home: usize,
}

impl RouteTable {
    pub fn new(login: RouteRecord, home: RouteRecord) -> Self {
        Self {
            records: vec![login, home],
            fallback: None,
            login: 0,
            home: 1,
        }
    }

    /// `login` at `/`, `dashboard` at `/dashboard` behind auth, and every
    /// other path redirected to `/`.
    pub fn standard() -> Self {
        Self::new(
            RouteRecord::new("login", "/"),
            RouteRecord::new("dashboard", "/dashboard").requires_auth(),
        )
        .fallback("/")
    }

    pub fn route(mut self, record: RouteRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Catch-all: any undeclared path redirects to `location`.
    pub fn fallback(mut self, location: impl Into<String>) -> Self {
        self.fallback = Some(location.into());
        self
    }

    pub fn login(&self) -> &RouteRecord {
        &self.records[self.login]
    }

    pub fn home(&self) -> &RouteRecord {
        &self.records[self.home]
    }

    pub fn records(&self) -> &[RouteRecord] {
        &self.records
    }

    pub fn find(&self, path: &str) -> Option<&RouteRecord> {
        self.records.iter().find(|r| r.matches(path))
    }

    /// Resolve an app-relative location such as `/dashboard?tab=2#top`.
    pub fn resolve(&self, location: &str) -> Result<ResolvedRoute, GuardError> {
        let base = Url::parse(APP_ORIGIN).map_err(|e| GuardError::InvalidLocation(e.to_string()))?;
        let url = base
            .join(location)
            .map_err(|_| GuardError::InvalidLocation(location.to_string()))?;
        if url.origin() != base.origin() {
            return Err(GuardError::InvalidLocation(location.to_string()));
        }

        let path = url.path().to_string();
        let Some(record) = self.find(&path) else {
            return match &self.fallback {
                Some(fallback) => Ok(ResolvedRoute::Redirect(fallback.clone())),
                None => Err(GuardError::NoMatch(path)),
            };
        };

        let mut full_path = path.clone();
        if let Some(query) = url.query() {
            full_path.push('?');
            full_path.push_str(query);
        }
        if let Some(fragment) = url.fragment() {
            full_path.push('#');
            full_path.push_str(fragment);
        }

        Ok(ResolvedRoute::Matched(RouteTarget {
            name: Some(record.name.clone()),
            path,
            full_path,
            query: url.query_pairs().into_owned().collect(),
            requires_auth: record.requires_auth,
        }))
    }
}
