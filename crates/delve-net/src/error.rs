use std::fmt;
use std::time::Duration;

use delve_core::ParseError;

#[derive(Debug)]
pub enum NetError {
    Http(reqwest::Error),
    /// Non-success HTTP status, with whatever message the body carried.
    Status { status: u16, message: String },
    /// Response arrived but did not have the expected shape.
    Decode(String),
    Timeout(Duration),
    /// No API key in the configured environment variable.
    MissingCredentials(String),
    Parse(ParseError),
}

impl NetError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            NetError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            NetError::Status { status, .. } => *status == 429 || *status >= 500,
            NetError::Timeout(_) => true,
            NetError::Decode(_) | NetError::MissingCredentials(_) | NetError::Parse(_) => false,
        }
    }
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Http(e) => write!(f, "HTTP error: {e}"),
            NetError::Status { status, message } if message.is_empty() => {
                write!(f, "HTTP status {status}")
            }
            NetError::Status { status, message } => write!(f, "HTTP status {status}: {message}"),
            NetError::Decode(msg) => write!(f, "unexpected response: {msg}"),
            NetError::Timeout(d) => write!(f, "timed out after {}ms", d.as_millis()),
            NetError::MissingCredentials(var) => write!(f, "no API key: {var} is not set"),
            NetError::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for NetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetError::Http(e) => Some(e),
            NetError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NetError {
    fn from(e: reqwest::Error) -> Self {
        NetError::Http(e)
    }
}

impl From<ParseError> for NetError {
    fn from(e: ParseError) -> Self {
        NetError::Parse(e)
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
