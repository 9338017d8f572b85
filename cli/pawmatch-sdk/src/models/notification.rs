use std::fmt::Display;

use pawmatch_catalog::GatewayError;

/// The categories of user visible notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The service rejected the supplied credentials
    AuthenticationFailed,
    /// The session ended, the user has to log in again
    SessionExpired,
    /// A request failed and may be retried
    Transient,
    /// A match was requested without any favorites
    EmptySelection,
}

/// A message for the user, replacing any previous notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notification {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn authentication_failed() -> Self {
        Self::new(
            NoticeKind::AuthenticationFailed,
            "Login failed, check your name and email.",
        )
    }

    pub fn session_expired() -> Self {
        Self::new(
            NoticeKind::SessionExpired,
            "Your session has expired, please log in again.",
        )
    }

    pub fn empty_selection() -> Self {
        Self::new(
            NoticeKind::EmptySelection,
            "Select at least one favorite before generating a match.",
        )
    }

    /// Describe a failed gateway request made while `action`.
    pub fn from_gateway_error(action: &str, err: &GatewayError) -> Self {
        if err.is_session_expired() {
            return Self::session_expired();
        }
        Self::new(NoticeKind::Transient, format!("Failed {action}: {err}"))
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Notification {}
