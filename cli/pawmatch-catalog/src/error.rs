//! Error handling for catalog gateway operations.

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use thiserror::Error;

/// Longest error detail carried over from a response body.
const MAX_DETAIL_LEN: usize = 200;

/// Common error type for catalog gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The service rejected the request credential.
    ///
    /// At login this means the credentials were refused,
    /// on any other call the session has expired.
    #[error("not authorized by the catalog service")]
    Unauthorized,
    #[error("{}", fmt_status(*.status, .detail.as_deref()))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("could not reach the catalog service")]
    Network(#[source] reqwest::Error),
    #[error("invalid response from the catalog service: {0}")]
    InvalidResponse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// Whether the error indicates the session credential is no longer
    /// accepted.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, GatewayError::Unauthorized)
    }

    /// Whether re-issuing the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Network(_) => true,
            GatewayError::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
            },
            GatewayError::InvalidResponse(_) => true,
            GatewayError::Unauthorized
            | GatewayError::InvalidRequest(_)
            | GatewayError::Other(_) => false,
        }
    }

    /// Converts a non-success response into an error,
    /// reading whatever detail the body carries.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return GatewayError::Unauthorized;
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));
        let is_text = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/plain"));

        // Bodies of other types are dropped, they tend to be HTML error pages.
        let detail = match response.text().await {
            Ok(body) if is_json => parse_json_detail(&body),
            Ok(body) if is_text => Some(body),
            _ => None,
        }
        .map(|detail| truncate_detail(detail.trim()))
        .filter(|detail| !detail.is_empty());

        GatewayError::Status { status, detail }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Network(err)
        }
    }
}

/// Validation failure for a single record received from the service.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("record is missing field '{0}'")]
    MissingField(&'static str),
    #[error("record has an empty identifier")]
    EmptyId,
    #[error("record has invalid age {0}")]
    InvalidAge(i64),
    #[error("record has invalid image reference '{0}'")]
    InvalidImage(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    detail: Option<String>,
}

fn parse_json_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.detail)
}

fn truncate_detail(detail: &str) -> String {
    match detail.char_indices().nth(MAX_DETAIL_LEN) {
        Some((end, _)) => format!("{}...", &detail[..end]),
        None => detail.to_string(),
    }
}

fn fmt_status(status: StatusCode, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("{status}: {detail}"),
        None => format!("{status}"),
    }
}
