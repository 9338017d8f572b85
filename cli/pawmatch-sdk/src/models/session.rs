use pawmatch_catalog::{Credentials, Gateway, GatewayError};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated {
        user: String,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("the catalog service rejected the credentials")]
    Rejected(#[source] GatewayError),
    #[error("could not log in")]
    Login(#[source] GatewayError),
    #[error("could not log out of the catalog service")]
    Logout(#[source] GatewayError),
}

/// Tracks whether the gateway holds a valid session credential.
///
/// The credential itself is a cookie kept by the HTTP client,
/// the session only records who logged in.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { user } => Some(user),
            SessionState::Unauthenticated => None,
        }
    }

    /// Establish a session.
    ///
    /// The state only changes if the gateway accepts the credentials.
    #[instrument(skip_all, fields(user = credentials.name()))]
    pub async fn login(
        &mut self,
        gateway: &impl Gateway,
        credentials: &Credentials,
    ) -> Result<(), SessionError> {
        match gateway.login(credentials).await {
            Ok(()) => {
                info!("logged in");
                self.state = SessionState::Authenticated {
                    user: credentials.name().to_string(),
                };
                Ok(())
            },
            // any client error at login is a refusal of the credentials
            Err(e @ GatewayError::Unauthorized) => Err(SessionError::Rejected(e)),
            Err(e @ GatewayError::Status { status, .. }) if status.is_client_error() => {
                Err(SessionError::Rejected(e))
            },
            Err(e) => Err(SessionError::Login(e)),
        }
    }

    /// End the session.
    ///
    /// Local state is cleared even if the remote logout fails.
    #[instrument(skip_all)]
    pub async fn logout(&mut self, gateway: &impl Gateway) -> Result<(), SessionError> {
        let result = gateway.logout().await;
        self.state = SessionState::Unauthenticated;
        match result {
            Ok(()) => {
                debug!("logged out");
                Ok(())
            },
            Err(e) => {
                warn!(error = %e, "remote logout failed");
                Err(SessionError::Logout(e))
            },
        }
    }

    /// Drop the session after the gateway stopped accepting it.
    pub fn expire(&mut self) {
        if self.is_authenticated() {
            info!("session expired");
        }
        self.state = SessionState::Unauthenticated;
    }
}
