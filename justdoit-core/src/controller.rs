//! Task list controller: the dashboard's state machine.
//!
//! Every user action returns at most one `Request` describing a single
//! backend call. The caller runs it (`execute`) and hands the `Response` back
//! to `apply`, which reconciles the visible list and may return a follow-up
//! request (the re-fetch after a successful save). `run` does the whole loop
//! for sequential callers; the TUI runs requests on a worker instead.
//!
//! Reconciliation rules:
//! - fetch: replaces the list; only the newest fetch is applied
//! - create / edit: re-fetch, so server-side filtering and ordering win
//! - toggle: patch in place by id, dropping the task if it left the active filter
//! - delete: remove by id
//! - `Unauthenticated` anywhere: token cleared, state reset, route -> login

use std::collections::BTreeMap;

use anyhow::Result;

use crate::api::TaskApi;
use crate::error::ApiError;
use crate::filter::{Filters, PriorityFilter, StatusFilter};
use crate::form::{Draft, EditTarget, FormState};
use crate::navigation::Route;
use crate::session::{BearerToken, Session, TokenStore};
use crate::task::{NewTask, Task, TaskId, TaskPatch};

pub const LOAD_FAILED: &str = "Failed to load tasks.";
pub const UPDATE_FAILED: &str = "Failed to update task.";
pub const SAVE_FAILED: &str = "Failed to save task.";
pub const DELETE_FAILED: &str = "Failed to delete task.";
pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";
pub const NOT_SIGNED_IN: &str = "Please log in.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Fetch(Filters),
    Create(NewTask),
    Update(TaskId, TaskPatch),
    Delete(TaskId),
}

#[derive(Debug, Clone)]
pub struct Request {
    pub seq: u64,
    pub token: BearerToken,
    pub op: Op,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Fetched(Result<Vec<Task>, ApiError>),
    Saved(Result<Task, ApiError>),
    Deleted(Result<(), ApiError>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub seq: u64,
    pub reply: Reply,
}

/// Run one request against the backend.
pub async fn execute<A: TaskApi>(api: &A, req: Request) -> Response {
    let Request { seq, token, op } = req;
    tracing::debug!(seq, op = ?op, "request");
    let reply = match op {
        Op::Fetch(filters) => Reply::Fetched(api.list_tasks(&token, &filters).await),
        Op::Create(task) => Reply::Saved(api.create_task(&token, &task).await),
        Op::Update(id, patch) => Reply::Saved(api.update_task(&token, id, &patch).await),
        Op::Delete(id) => Reply::Deleted(api.delete_task(&token, id).await),
    };
    Response { seq, reply }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    Invalid(&'static str),
    /// A previous submission has not been answered yet.
    InFlight,
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Invalid(msg) => f.write_str(msg),
            SubmitError::InFlight => f.write_str("Still saving the previous change."),
        }
    }
}

impl std::error::Error for SubmitError {}

/// What an outstanding request was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Fetch,
    Create,
    Edit(TaskId),
    Toggle(TaskId),
    Delete(TaskId),
}

impl Pending {
    fn is_submit(self) -> bool {
        matches!(self, Pending::Create | Pending::Edit(_))
    }
}

pub struct TaskListController<S: TokenStore> {
    session: Session<S>,
    phase: Phase,
    tasks: Vec<Task>,
    filters: Filters,
    form: FormState,
    notice: Option<String>,
    route: Route,
    next_seq: u64,
    pending: BTreeMap<u64, Pending>,
}

impl<S: TokenStore> TaskListController<S> {
    pub fn new(session: Session<S>) -> Self {
        Self {
            session,
            phase: Phase::Loading,
            tasks: Vec::new(),
            filters: Filters::default(),
            form: FormState::default(),
            notice: None,
            route: Route::Dashboard,
            next_seq: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn filters(&self) -> Filters {
        self.filters
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// Draft fields are free to edit; the create/edit target only moves via
    /// `begin_edit`, `cancel_edit` and a successful submit.
    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.form.draft
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn into_session(self) -> Session<S> {
        self.session
    }

    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.values().any(|p| p.is_submit())
    }

    /// Dashboard opened: defaults restored, first fetch issued with no filters.
    pub fn mount(&mut self) -> Option<Request> {
        self.filters = Filters::default();
        self.form.reset();
        self.notice = None;
        self.route = Route::Dashboard;
        self.fetch()
    }

    pub fn refresh(&mut self) -> Option<Request> {
        self.fetch()
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) -> Option<Request> {
        if self.filters.status == status {
            return None;
        }
        self.filters.status = status;
        self.fetch()
    }

    pub fn set_priority_filter(&mut self, priority: PriorityFilter) -> Option<Request> {
        if self.filters.priority == priority {
            return None;
        }
        self.filters.priority = priority;
        self.fetch()
    }

    /// Ignored while an earlier toggle of the same task is unanswered,
    /// since its flag would be computed from a stale `completed`.
    pub fn toggle(&mut self, id: TaskId) -> Option<Request> {
        if self.pending.values().any(|p| *p == Pending::Toggle(id)) {
            tracing::debug!(%id, "toggle already in flight");
            return None;
        }
        let completed = self.task(id)?.completed;
        self.notice = None;
        self.issue(Pending::Toggle(id), Op::Update(id, TaskPatch::completed(!completed)))
    }

    /// Returns false when `id` is not in the visible list.
    pub fn begin_edit(&mut self, id: TaskId) -> bool {
        let Some(task) = self.tasks.iter().find(|t| t.id == id) else {
            return false;
        };
        self.form.begin_edit(task);
        true
    }

    pub fn cancel_edit(&mut self) {
        self.form.reset();
    }

    /// Create in create mode, update in edit mode. `Ok(None)` means the
    /// session was gone and the controller already redirected to login.
    pub fn submit(&mut self) -> Result<Option<Request>, SubmitError> {
        if self.is_submitting() {
            return Err(SubmitError::InFlight);
        }
        if let Err(msg) = self.form.validate() {
            self.notice = Some(msg.to_string());
            return Err(SubmitError::Invalid(msg));
        }
        self.notice = None;
        let req = match self.form.target {
            EditTarget::Creating => self.issue(Pending::Create, Op::Create(self.form.to_new_task())),
            EditTarget::Editing(id) => self.issue(Pending::Edit(id), Op::Update(id, self.form.to_patch())),
        };
        Ok(req)
    }

    pub fn delete(&mut self, id: TaskId) -> Option<Request> {
        self.notice = None;
        self.issue(Pending::Delete(id), Op::Delete(id))
    }

    /// User-initiated sign-out.
    pub fn logout(&mut self) -> Result<()> {
        self.session.sign_out()?;
        self.reset(Phase::Loading);
        tracing::info!("logged out");
        Ok(())
    }

    /// Reconcile a response. Unknown or superseded sequence numbers are ignored.
    pub fn apply(&mut self, resp: Response) -> Option<Request> {
        let Some(pending) = self.pending.remove(&resp.seq) else {
            tracing::debug!(seq = resp.seq, "dropping stale response");
            return None;
        };

        match (pending, resp.reply) {
            (Pending::Fetch, Reply::Fetched(Ok(tasks))) => {
                tracing::debug!(count = tasks.len(), "tasks loaded");
                self.tasks = tasks;
                self.phase = Phase::Ready;
                None
            }
            (Pending::Fetch, Reply::Fetched(Err(e))) => {
                if e.is_unauthenticated() {
                    self.expire(SESSION_EXPIRED);
                } else {
                    tracing::warn!(error = %e, "task fetch failed");
                    self.phase = Phase::Error(format!("{LOAD_FAILED} {e}"));
                }
                None
            }
            (Pending::Toggle(id), Reply::Saved(Ok(task))) => {
                self.replace_in_place(id, task);
                None
            }
            (Pending::Create | Pending::Edit(_), Reply::Saved(Ok(task))) => {
                tracing::info!(id = %task.id, "task saved");
                self.form.reset();
                self.fetch()
            }
            (Pending::Delete(id), Reply::Deleted(Ok(()))) => {
                self.tasks.retain(|t| t.id != id);
                if self.form.editing_id() == Some(id) {
                    self.form.reset();
                }
                None
            }
            (pending, reply) => {
                let err = match reply {
                    Reply::Fetched(r) => r.err(),
                    Reply::Saved(r) => r.err(),
                    Reply::Deleted(r) => r.err(),
                };
                match err {
                    Some(e) if e.is_unauthenticated() => self.expire(SESSION_EXPIRED),
                    Some(e) => {
                        tracing::warn!(error = %e, action = ?pending, "request failed");
                        self.notice = Some(failure_message(pending).to_string());
                    }
                    None => tracing::warn!(action = ?pending, "reply did not match request"),
                }
                None
            }
        }
    }

    /// Execute `request` and every follow-up it triggers.
    pub async fn run<A: TaskApi>(&mut self, api: &A, request: Option<Request>) {
        let mut next = request;
        while let Some(req) = next {
            let resp = execute(api, req).await;
            next = self.apply(resp);
        }
    }

    fn fetch(&mut self) -> Option<Request> {
        // a newer fetch supersedes any outstanding one
        self.pending.retain(|_, p| *p != Pending::Fetch);
        let req = self.issue(Pending::Fetch, Op::Fetch(self.filters))?;
        self.phase = Phase::Loading;
        Some(req)
    }

    fn issue(&mut self, pending: Pending, op: Op) -> Option<Request> {
        let token = match self.session.bearer() {
            Ok(t) => t,
            Err(_) => {
                self.signed_out(NOT_SIGNED_IN);
                return None;
            }
        };
        self.next_seq += 1;
        let seq = self.next_seq;
        self.pending.insert(seq, pending);
        Some(Request { seq, token, op })
    }

    fn replace_in_place(&mut self, id: TaskId, task: Task) {
        let keep = self.filters.matches(&task);
        if let Some(pos) = self.tasks.iter().position(|t| t.id == id) {
            if keep {
                self.tasks[pos] = task;
            } else {
                self.tasks.remove(pos);
            }
        }
    }

    fn expire(&mut self, reason: &str) {
        if let Err(e) = self.session.invalidate() {
            tracing::warn!(error = %e, "could not clear stored token");
        }
        tracing::info!(reason, "signed out");
        self.reset(Phase::Error(reason.to_string()));
    }

    /// No token to begin with: nothing was rejected, so the invalidation hook stays quiet.
    fn signed_out(&mut self, reason: &str) {
        if let Err(e) = self.session.sign_out() {
            tracing::warn!(error = %e, "could not clear stored token");
        }
        self.reset(Phase::Error(reason.to_string()));
    }

    fn reset(&mut self, phase: Phase) {
        self.tasks.clear();
        self.filters = Filters::default();
        self.form.reset();
        self.notice = None;
        self.pending.clear();
        self.phase = phase;
        self.route = Route::Login;
    }
}

fn failure_message(pending: Pending) -> &'static str {
    match pending {
        Pending::Fetch => LOAD_FAILED,
        Pending::Toggle(_) => UPDATE_FAILED,
        Pending::Create | Pending::Edit(_) => SAVE_FAILED,
        Pending::Delete(_) => DELETE_FAILED,
    }
}
