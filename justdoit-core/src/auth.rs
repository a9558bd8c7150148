//! Login / registration flow.
//!
//! Form -> Submitting -> Success | Failure. A failed attempt leaves the user
//! on the form; submitting again is a fresh attempt.

use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

use crate::api::{Account, Credentials, TaskApi};
use crate::error::ApiError;
use crate::navigation::{Navigator, Route};
use crate::session::{BearerToken, Session, TokenStore};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const REGISTERED: &str = "Account created. Please log in.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Form,
    Submitting,
    Success,
    Failure(String),
}

pub fn validate_credentials(creds: &Credentials) -> Result<(), String> {
    if !EMAIL_RE.is_match(creds.email.trim()) {
        return Err("Please enter a valid email address".to_string());
    }
    if creds.password.is_empty() {
        return Err("Password is required".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AuthFlow {
    mode: AuthMode,
    state: AuthState,
}

impl AuthFlow {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            state: AuthState::Form,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            AuthState::Failure(msg) => Some(msg),
            _ => None,
        }
    }

    /// Validate input and move to `Submitting`. Returns false when no request
    /// should be sent (bad input, or an attempt already in flight).
    pub fn begin(&mut self, creds: &Credentials) -> bool {
        if self.state == AuthState::Submitting {
            return false;
        }
        match validate_credentials(creds) {
            Ok(()) => {
                self.state = AuthState::Submitting;
                true
            }
            Err(msg) => {
                self.state = AuthState::Failure(msg);
                false
            }
        }
    }

    pub fn finish_login<S: TokenStore>(
        &mut self,
        result: Result<BearerToken, ApiError>,
        session: &mut Session<S>,
        nav: &mut Navigator,
    ) -> Result<()> {
        match result {
            Ok(token) => {
                session.sign_in(&token)?;
                self.state = AuthState::Success;
                nav.go(Route::Dashboard, true);
                tracing::info!("login succeeded");
            }
            Err(ApiError::Auth(_)) => {
                self.state = AuthState::Failure(INVALID_CREDENTIALS.to_string());
                tracing::info!("login rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "login failed");
                self.state = AuthState::Failure(format!("Login failed: {e}"));
            }
        }
        Ok(())
    }

    pub fn finish_register(&mut self, result: Result<Account, ApiError>, nav: &mut Navigator) {
        match result {
            Ok(account) => {
                self.state = AuthState::Success;
                nav.go(Route::Login, false);
                nav.set_flash(REGISTERED);
                tracing::info!(account_id = account.id, "registered");
            }
            Err(e) => {
                tracing::warn!(error = %e, "registration failed");
                self.state = AuthState::Failure(e.to_string());
            }
        }
    }

    /// Run one full attempt against `api`.
    pub async fn submit<A: TaskApi, S: TokenStore>(
        &mut self,
        api: &A,
        creds: &Credentials,
        session: &mut Session<S>,
        nav: &mut Navigator,
    ) -> Result<&AuthState> {
        if !self.begin(creds) {
            return Ok(&self.state);
        }
        match self.mode {
            AuthMode::Login => {
                let res = api.login(creds).await;
                self.finish_login(res, session, nav)?;
            }
            AuthMode::Register => {
                let res = api.register(creds).await;
                self.finish_register(res, nav);
            }
        }
        Ok(&self.state)
    }
}
