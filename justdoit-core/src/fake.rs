//! In-memory backend used by the controller and auth tests.

use std::sync::Mutex;

use crate::api::{Account, Credentials, TaskApi};
use crate::error::ApiError;
use crate::filter::Filters;
use crate::session::BearerToken;
use crate::task::{NewTask, Task, TaskId, TaskPatch};

pub const TOKEN: &str = "good-token";

#[derive(Debug, Default)]
struct State {
    tasks: Vec<Task>,
    next_id: i64,
    fail_next: Option<ApiError>,
    calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let next_id = tasks.iter().map(|t| t.id.0).max().unwrap_or(0) + 1;
        Self {
            state: Mutex::new(State {
                tasks,
                next_id,
                ..State::default()
            }),
        }
    }

    /// The next call (of any kind) fails with `err`.
    pub fn fail_next(&self, err: ApiError) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn enter(&self, call: String, token: Option<&BearerToken>) -> Result<std::sync::MutexGuard<'_, State>, ApiError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(call);
        if let Some(err) = st.fail_next.take() {
            return Err(err);
        }
        if let Some(t) = token {
            if t.as_str() != TOKEN {
                return Err(ApiError::Unauthenticated);
            }
        }
        Ok(st)
    }
}

impl TaskApi for FakeApi {
    async fn login(&self, creds: &Credentials) -> Result<BearerToken, ApiError> {
        let _st = self.enter("login".into(), None)?;
        if creds.password == "pw" {
            Ok(BearerToken::new(TOKEN))
        } else {
            Err(ApiError::Auth("Invalid Credentials".into()))
        }
    }

    async fn register(&self, creds: &Credentials) -> Result<Account, ApiError> {
        let _st = self.enter("register".into(), None)?;
        Ok(Account {
            id: 1,
            email: creds.email.clone(),
            created_at: None,
        })
    }

    async fn me(&self, token: &BearerToken) -> Result<Account, ApiError> {
        let _st = self.enter("me".into(), Some(token))?;
        Ok(Account {
            id: 1,
            email: "a@b.com".into(),
            created_at: None,
        })
    }

    async fn list_tasks(&self, token: &BearerToken, filters: &Filters) -> Result<Vec<Task>, ApiError> {
        let st = self.enter(format!("list {:?}", filters.query()), Some(token))?;
        Ok(st.tasks.iter().filter(|t| filters.matches(t)).cloned().collect())
    }

    async fn get_task(&self, token: &BearerToken, id: TaskId) -> Result<Task, ApiError> {
        let st = self.enter(format!("get {id}"), Some(token))?;
        st.tasks.iter().find(|t| t.id == id).cloned().ok_or(ApiError::NotFound)
    }

    async fn create_task(&self, token: &BearerToken, task: &NewTask) -> Result<Task, ApiError> {
        let mut st = self.enter(format!("create {}", task.title), Some(token))?;
        let id = st.next_id;
        st.next_id += 1;
        let created = Task::new(id, task.title.clone())
            .with_description(task.description.clone())
            .with_priority(task.priority);
        st.tasks.push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, token: &BearerToken, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        let mut st = self.enter(format!("update {id}"), Some(token))?;
        let slot = st.tasks.iter_mut().find(|t| t.id == id).ok_or(ApiError::NotFound)?;
        *slot = slot.patched(patch);
        Ok(slot.clone())
    }

    async fn delete_task(&self, token: &BearerToken, id: TaskId) -> Result<(), ApiError> {
        let mut st = self.enter(format!("delete {id}"), Some(token))?;
        let before = st.tasks.len();
        st.tasks.retain(|t| t.id != id);
        if st.tasks.len() == before {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}
