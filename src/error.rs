use std::fmt::{self, Display, Formatter};

#[derive(Debug)]
pub enum Error {
    /// An expected element or attribute was missing from a vendor page.
    Parse(String),
    /// Bad credentials, unreachable customer portal, or an expired session.
    Login(String),
    /// The vendor reported an error other than authentication.
    Api(String),
    NotLoggedIn,
    /// A requested date range runs past the last representable date.
    Range(String),
    Request(reqwest::Error),
    Json(serde_json::Error),
}

impl Error {
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn login_error(msg: impl Into<String>) -> Self {
        Self::Login(msg.into())
    }

    pub fn api_error(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "Parse error: {msg}"),
            Self::Login(msg) => write!(f, "Login error: {msg}"),
            Self::Api(msg) => write!(f, "Got an error from the API: {msg}"),
            Self::NotLoggedIn => write!(f, "Not logged in"),
            Self::Range(msg) => write!(f, "Invalid date range: {msg}"),
            Self::Request(e) => write!(f, "Request error: {e}"),
            Self::Json(e) => write!(f, "Json error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
