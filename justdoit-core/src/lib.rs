//! justdoit-core: task model, session, and the dashboard state machine

pub mod api;
pub mod auth;
pub mod controller;
pub mod error;
pub mod filter;
pub mod form;
pub mod navigation;
pub mod session;
pub mod task;
pub mod time;

#[cfg(test)]
mod fake;

pub use api::{Account, Credentials, TaskApi};
pub use auth::{AuthFlow, AuthMode, AuthState};
pub use controller::{Op, Phase, Reply, Request, Response, SubmitError, TaskListController, execute};
pub use error::ApiError;
pub use filter::{Filters, PriorityFilter, StatusFilter};
pub use form::{Draft, EditTarget, FormState};
pub use navigation::{Navigator, Route};
pub use session::{BearerToken, MemoryTokenStore, Session, TokenStore};
pub use task::{NewTask, Priority, Task, TaskId, TaskPatch};
