//! Bearer token storage and the session that owns it.
//!
//! The session is the only writer of the token. Everything that needs to make
//! an authorized call asks the session for a `BearerToken`; when none is
//! stored the answer is `Unauthenticated` without touching the network.

use anyhow::Result;
use std::fmt;

use crate::error::ApiError;

/// Opaque credential. `Debug` redacts the value so it never reaches logs.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Client-persistent storage for a single token.
pub trait TokenStore {
    /// Persist, replacing any previous value.
    fn save(&mut self, token: &BearerToken) -> Result<()>;
    fn read(&self) -> Result<Option<BearerToken>>;
    /// Remove the token. Clearing an empty store is not an error.
    fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryTokenStore {
    token: Option<BearerToken>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(BearerToken::new(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&mut self, token: &BearerToken) -> Result<()> {
        self.token = Some(token.clone());
        Ok(())
    }

    fn read(&self) -> Result<Option<BearerToken>> {
        Ok(self.token.clone())
    }

    fn clear(&mut self) -> Result<()> {
        self.token = None;
        Ok(())
    }
}

type InvalidateHook = Box<dyn FnMut() + Send>;

pub struct Session<S: TokenStore> {
    store: S,
    on_invalidate: Option<InvalidateHook>,
}

impl<S: TokenStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            on_invalidate: None,
        }
    }

    /// Called every time the backend rejects the token (not on plain sign-out).
    pub fn on_invalidate(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_invalidate = Some(Box::new(hook));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sign_in(&mut self, token: &BearerToken) -> Result<()> {
        self.store.save(token)
    }

    /// Token for an authorized call. A storage read error counts as signed out.
    pub fn bearer(&self) -> Result<BearerToken, ApiError> {
        match self.store.read() {
            Ok(Some(t)) => Ok(t),
            Ok(None) => Err(ApiError::Unauthenticated),
            Err(e) => {
                tracing::warn!(error = %e, "token store read failed");
                Err(ApiError::Unauthenticated)
            }
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.bearer().is_ok()
    }

    pub fn sign_out(&mut self) -> Result<()> {
        self.store.clear()
    }

    /// The backend refused our token: drop it and notify the hook.
    pub fn invalidate(&mut self) -> Result<()> {
        let res = self.store.clear();
        if let Some(hook) = self.on_invalidate.as_mut() {
            hook();
        }
        res
    }
}

impl<S: TokenStore + fmt::Debug> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("store", &self.store).finish()
    }
}
