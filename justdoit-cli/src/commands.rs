//! One-shot task commands. Each drives the same controller the dashboard
//! uses, so reconciliation and session handling are identical.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Utc};
use justdoit_api::HttpApi;
use justdoit_core::{
    Filters, Phase, Priority, Request, Route, Session, Task, TaskApi, TaskId, TaskListController,
};

use crate::auth::FileTokenStore;

type Controller = TaskListController<FileTokenStore>;

/// Mount and narrow to `filters`, sending only the final fetch.
fn open(session: Session<FileTokenStore>, filters: Filters) -> (Controller, Option<Request>) {
    let mut c = TaskListController::new(session);
    let mut req = c.mount();
    if let Some(r) = c.set_status_filter(filters.status) {
        req = Some(r);
    }
    if let Some(r) = c.set_priority_filter(filters.priority) {
        req = Some(r);
    }
    (c, req)
}

async fn load(api: &HttpApi, session: Session<FileTokenStore>, filters: Filters) -> Result<Controller> {
    let (mut c, req) = open(session, filters);
    c.run(api, req).await;
    check(&c)?;
    Ok(c)
}

/// Turn controller state after a run into a command result.
fn check(c: &Controller) -> Result<()> {
    if c.route() == Route::Login {
        let reason = match c.phase() {
            Phase::Error(msg) => msg.clone(),
            _ => "Please log in.".to_string(),
        };
        bail!("{reason} Run: justdoit login");
    }
    if let Phase::Error(msg) = c.phase() {
        bail!("{msg}");
    }
    if let Some(notice) = c.notice() {
        bail!("{notice}");
    }
    Ok(())
}

pub fn render_task(t: &Task) -> String {
    let mut s = format!(
        "[{}] #{:<4} {} ({})",
        if t.completed { "x" } else { " " },
        t.id.0,
        t.title,
        Priority::badge(t.priority)
    );
    if let Some(d) = t.description.as_deref().filter(|d| !d.trim().is_empty()) {
        s.push_str(&format!("\n         {}", d.trim()));
    }
    s
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks yet. Time to relax!");
        return;
    }
    for t in tasks {
        println!("{}", render_task(t));
    }
}

pub async fn list(api: &HttpApi, session: Session<FileTokenStore>, filters: Filters) -> Result<()> {
    let c = load(api, session, filters).await?;
    if !filters.is_default() {
        println!("Filter: {} / {}\n", filters.status, filters.priority);
    }
    print_tasks(c.tasks());
    Ok(())
}

pub async fn show(api: &HttpApi, mut session: Session<FileTokenStore>, id: TaskId) -> Result<()> {
    let Ok(token) = session.bearer() else {
        bail!("Please log in. Run: justdoit login");
    };
    match api.get_task(&token, id).await {
        Ok(t) => {
            println!("{}", render_task(&t));
            if let Some(at) = t.created_at {
                println!("         created {}", local_time(at));
            }
            if let Some(at) = t.updated_at {
                println!("         updated {}", local_time(at));
            }
            Ok(())
        }
        Err(e) if e.is_unauthenticated() => {
            session.invalidate()?;
            bail!("Session expired. Please log in again. Run: justdoit login")
        }
        Err(e) => Err(e).with_context(|| format!("GET /todos/{id}")),
    }
}

pub async fn add(
    api: &HttpApi,
    session: Session<FileTokenStore>,
    title: String,
    description: Option<String>,
    priority: Priority,
) -> Result<()> {
    let mut c = TaskListController::new(session);
    let draft = c.draft_mut();
    draft.title = title;
    draft.description = description.unwrap_or_default();
    draft.priority = priority;

    let req = c.submit()?;
    c.run(api, req).await;
    check(&c)?;
    println!("Task saved.\n");
    print_tasks(c.tasks());
    Ok(())
}

pub async fn edit(
    api: &HttpApi,
    session: Session<FileTokenStore>,
    id: TaskId,
    title: Option<String>,
    description: Option<String>,
    priority: Option<Priority>,
) -> Result<()> {
    if title.is_none() && description.is_none() && priority.is_none() {
        bail!("nothing to change (pass --title, --description or --priority)");
    }
    let mut c = load(api, session, Filters::default()).await?;
    if !c.begin_edit(id) {
        bail!("no task with id {id}");
    }
    let draft = c.draft_mut();
    if let Some(t) = title {
        draft.title = t;
    }
    if let Some(d) = description {
        draft.description = d;
    }
    if let Some(p) = priority {
        draft.priority = p;
    }

    let req = c.submit()?;
    c.run(api, req).await;
    check(&c)?;
    match c.task(id) {
        Some(t) => println!("{}", render_task(t)),
        None => println!("Task #{id} saved."),
    }
    Ok(())
}

pub async fn toggle(api: &HttpApi, session: Session<FileTokenStore>, id: TaskId) -> Result<()> {
    let mut c = load(api, session, Filters::default()).await?;
    let Some(req) = c.toggle(id) else {
        bail!("no task with id {id}");
    };
    c.run(api, Some(req)).await;
    check(&c)?;
    if let Some(t) = c.task(id) {
        println!("{}", render_task(t));
    }
    Ok(())
}

pub async fn delete(api: &HttpApi, session: Session<FileTokenStore>, id: TaskId) -> Result<()> {
    let mut c = TaskListController::new(session);
    let req = c.delete(id);
    c.run(api, req).await;
    check(&c)?;
    println!("Deleted task #{id}");
    Ok(())
}
