//! Response shapes that only exist at the HTTP boundary.
//!
//! Decoding is strict where the client depends on a field and lenient where
//! the backend is known to vary (the login token key, error details).

use justdoit_core::{ApiError, BearerToken};
use serde::Deserialize;
use serde_json::Value;

/// `POST /auth/login` answers `{"access token": "...", "token_type": "bearer"}`.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "access token", alias = "access_token")]
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl LoginResponse {
    pub fn into_token(self) -> Result<BearerToken, ApiError> {
        if let Some(kind) = &self.token_type {
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(ApiError::Decode(format!("unsupported token_type: {kind}")));
            }
        }
        if self.access_token.trim().is_empty() {
            return Err(ApiError::Decode("empty access token".to_string()));
        }
        Ok(BearerToken::new(self.access_token))
    }
}

/// Pull a human-readable message out of an error body.
///
/// FastAPI sends `{"detail": "..."}` for handled errors and
/// `{"detail": [{"msg": "..."}, ...]}` for validation failures.
pub fn error_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    match json.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|i| i.get("msg").and_then(Value::as_str))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}
