use std::fmt;

/// Failure to turn raw model output into a [`GenerateResponse`](crate::GenerateResponse).
#[derive(Debug)]
pub enum ParseError {
    /// The text contained no `{ ... }` object at all.
    NoJsonObject,
    /// An object was found but did not decode.
    Json(serde_json::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::NoJsonObject => write!(f, "model output contains no JSON object"),
            ParseError::Json(e) => write!(f, "invalid model JSON: {e}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Json(e) => Some(e),
            ParseError::NoJsonObject => None,
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
