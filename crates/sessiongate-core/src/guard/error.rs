use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GuardError {
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("No route matches {0}")]
    NoMatch(String),

    #[error("Too many redirects navigating to {0}")]
    TooManyRedirects(String),
}
