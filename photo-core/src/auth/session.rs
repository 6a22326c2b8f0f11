//! src/auth/session.rs
//! ============================================================================
//! # `AuthSession`: login state of the implicit cookie session
//!
//! The backend keeps the session in HTTP-only cookies held by the transport,
//! so the client only tracks whether it believes a session exists. A
//! successful signup counts as a login. Logout clears local state even when
//! the server call fails.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::{
    error::{ExplorerError, ExplorerResult},
    remote::{AuthClient, Credentials},
};

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// Start-up, before `restore` has answered
    #[default]
    Unknown,
    Anonymous,
    Authenticated {
        /// Known after an interactive login, `None` after a restored session
        email: Option<String>,
    },
}

impl AuthState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

pub struct AuthSession {
    client: Arc<dyn AuthClient>,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    pub fn new(client: Arc<dyn AuthClient>) -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self { client, state }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn set(&self, next: AuthState) -> AuthState {
        self.state.send_replace(next.clone());
        next
    }

    /// Ask the server to renew the session from its refresh cookie.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> AuthState {
        match self.client.refresh().await {
            Ok(()) => {
                info!(marker = "AUTH", operation_type = "restore", "Session restored");
                self.set(AuthState::Authenticated { email: None })
            }
            Err(e) => {
                info!(
                    marker = "AUTH",
                    operation_type = "restore",
                    reason = %e,
                    "No session to restore"
                );
                self.set(AuthState::Anonymous)
            }
        }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ExplorerResult<()> {
        let credentials = validate(email, password)?;
        self.client.login(&credentials).await.inspect_err(|e| {
            warn!(marker = "AUTH", operation_type = "login", error = %e, "Login failed");
        })?;

        self.set(AuthState::Authenticated {
            email: Some(credentials.email),
        });
        Ok(())
    }

    #[instrument(skip(self, password))]
    pub async fn signup(&self, email: &str, password: &str) -> ExplorerResult<()> {
        let credentials = validate(email, password)?;
        self.client.signup(&credentials).await.inspect_err(|e| {
            warn!(marker = "AUTH", operation_type = "signup", error = %e, "Signup failed");
        })?;

        self.set(AuthState::Authenticated {
            email: Some(credentials.email),
        });
        Ok(())
    }

    /// Best-effort server logout; local state always ends `Anonymous`.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self.client.logout().await {
            warn!(
                marker = "AUTH",
                operation_type = "logout",
                error = %e,
                "Server logout failed, clearing local session anyway"
            );
        }
        self.set(AuthState::Anonymous);
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

fn validate(email: &str, password: &str) -> ExplorerResult<Credentials> {
    let email = email.trim();
    if !EMAIL.is_match(email) {
        return Err(ExplorerError::validation("email", "not a valid email address"));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ExplorerError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    Ok(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}
