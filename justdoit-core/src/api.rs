//! The backend contract as the client consumes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

use crate::error::ApiError;
use crate::filter::Filters;
use crate::session::BearerToken;
use crate::task::{NewTask, Task, TaskId, TaskPatch};
use crate::time;

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Returned by register and `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    #[serde(default, deserialize_with = "time::lenient_utc", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Every protected call takes the token explicitly; obtaining one is the
/// session's job.
pub trait TaskApi: Sync {
    fn login(&self, creds: &Credentials) -> impl Future<Output = Result<BearerToken, ApiError>> + Send;

    fn register(&self, creds: &Credentials) -> impl Future<Output = Result<Account, ApiError>> + Send;

    fn me(&self, token: &BearerToken) -> impl Future<Output = Result<Account, ApiError>> + Send;

    fn list_tasks(
        &self,
        token: &BearerToken,
        filters: &Filters,
    ) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;

    fn get_task(
        &self,
        token: &BearerToken,
        id: TaskId,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    fn create_task(
        &self,
        token: &BearerToken,
        task: &NewTask,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    fn update_task(
        &self,
        token: &BearerToken,
        id: TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    fn delete_task(
        &self,
        token: &BearerToken,
        id: TaskId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}
