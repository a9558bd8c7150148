//! reqwest implementation of the backend contract.

use anyhow::{Context, Result};
use justdoit_core::{
    Account, ApiError, BearerToken, Credentials, Filters, NewTask, Task, TaskApi, TaskId,
    TaskPatch,
};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::wire::{LoginResponse, error_detail};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    /// `timeout = None` keeps reqwest's default (no overall timeout).
    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    fn authorized(&self, method: Method, path: &str, token: &BearerToken) -> RequestBuilder {
        self.request(method, path)
            .header(AUTHORIZATION, token.header_value())
    }

    /// Unauthenticated endpoints: any non-2xx is an auth failure.
    async fn send_auth<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T, ApiError> {
        let resp = req.send().await.map_err(network)?;
        let status = resp.status();
        tracing::debug!(%status, what, "auth response");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let msg = error_detail(&body).unwrap_or_else(|| format!("{what} failed ({status})"));
            return Err(ApiError::Auth(msg));
        }
        decode(resp).await
    }

    /// Protected endpoints: 401/403 mean the token is no good.
    async fn send_protected(&self, req: RequestBuilder, what: &str) -> Result<reqwest::Response, ApiError> {
        let resp = req.send().await.map_err(network)?;
        let status = resp.status();
        tracing::debug!(%status, what, "response");
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(protected_error(status, &body))
    }
}

fn network(e: reqwest::Error) -> ApiError {
    ApiError::Network(e.to_string())
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let bytes = resp.bytes().await.map_err(network)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

pub fn protected_error(status: StatusCode, body: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthenticated,
        StatusCode::NOT_FOUND => ApiError::NotFound,
        other => ApiError::Server {
            status: other.as_u16(),
            message: error_detail(body).unwrap_or_else(|| body.trim().to_string()),
        },
    }
}

impl TaskApi for HttpApi {
    async fn login(&self, creds: &Credentials) -> Result<BearerToken, ApiError> {
        let req = self.request(Method::POST, "/auth/login").json(creds);
        let out: LoginResponse = self.send_auth(req, "login").await?;
        out.into_token()
    }

    async fn register(&self, creds: &Credentials) -> Result<Account, ApiError> {
        let req = self.request(Method::POST, "/auth/register").json(creds);
        self.send_auth(req, "register").await
    }

    async fn me(&self, token: &BearerToken) -> Result<Account, ApiError> {
        let req = self.authorized(Method::GET, "/auth/me", token);
        decode(self.send_protected(req, "me").await?).await
    }

    async fn list_tasks(&self, token: &BearerToken, filters: &Filters) -> Result<Vec<Task>, ApiError> {
        let req = self
            .authorized(Method::GET, "/todos", token)
            .query(&filters.query());
        decode(self.send_protected(req, "list").await?).await
    }

    async fn get_task(&self, token: &BearerToken, id: TaskId) -> Result<Task, ApiError> {
        let req = self.authorized(Method::GET, &format!("/todos/{id}"), token);
        decode(self.send_protected(req, "get").await?).await
    }

    async fn create_task(&self, token: &BearerToken, task: &NewTask) -> Result<Task, ApiError> {
        let req = self.authorized(Method::POST, "/todos", token).json(task);
        decode(self.send_protected(req, "create").await?).await
    }

    async fn update_task(&self, token: &BearerToken, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        let req = self
            .authorized(Method::PUT, &format!("/todos/{id}"), token)
            .json(patch);
        decode(self.send_protected(req, "update").await?).await
    }

    async fn delete_task(&self, token: &BearerToken, id: TaskId) -> Result<(), ApiError> {
        let req = self.authorized(Method::DELETE, &format!("/todos/{id}"), token);
        // 204 or 200 with a message; the body is not needed
        self.send_protected(req, "delete").await.map(|_| ())
    }
}
