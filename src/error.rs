//! error types
//!
//! structured errors for config, http, json, api, graphql, and query-builder failures.

use crate::graphql::GraphQlError;
use serde::Deserialize;
use std::fmt;

/// library result type
pub type Result<T> = std::result::Result<T, Error>;

/// error code the service uses for queries that are too expensive to answer
pub const REQUEST_TOO_LARGE: u16 = 408;

/// error type for the client, the typed api layer, and the query executor
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("api error {code}: {message}")]
    Api {
        /// http status
        status: u16,
        /// error code reported in the body (falls back to the status)
        code: u16,
        /// error message reported by the service
        message: String,
        /// identifiers the service reported as missing
        missing: Vec<serde_json::Value>,
        /// identifiers the service reported as duplicated
        duplicated: Vec<serde_json::Value>,
        /// raw response body
        body: String,
    },

    #[error("graphql error: {message}")]
    GraphQl {
        /// http status if available
        status: Option<u16>,
        /// graphql error list
        errors: Vec<GraphQlError>,
        /// raw response body
        body: String,
        /// top-level message
        message: String,
    },

    #[error("query error: {0}")]
    Query(String),
}

impl Error {
    /// true if the error looks like an auth failure
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Api { status: 401 | 403, .. })
            || matches!(self, Error::GraphQl { status: Some(401 | 403), .. })
            || matches!(self, Error::Http(err) if err.status() == Some(reqwest::StatusCode::UNAUTHORIZED))
    }

    /// true if the service rejected the request as too large to answer in one call
    pub fn is_request_too_large(&self) -> bool {
        matches!(self, Error::Api { code: REQUEST_TOO_LARGE, .. })
    }

    /// build an api error from a non-success response body
    pub(crate) fn from_api_body(status: u16, body: String) -> Self {
        match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => Error::Api {
                status,
                code: parsed.error.code.unwrap_or(status),
                message: parsed.error.message,
                missing: parsed.error.missing,
                duplicated: parsed.error.duplicated,
                body,
            },
            Err(_) => Error::Api {
                status,
                code: status,
                message: format!("api http error: {status}"),
                missing: Vec::new(),
                duplicated: Vec::new(),
                body,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: Option<u16>,
    message: String,
    #[serde(default)]
    missing: Vec<serde_json::Value>,
    #[serde(default)]
    duplicated: Vec<serde_json::Value>,
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
