use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use justdoit_api::HttpApi;
use justdoit_core::{
    Phase, Priority, Request, Response, Route, Session, SubmitError, TaskId, TaskListController,
    TokenStore,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::auth::FileTokenStore;
use crate::dashboard_worker::run_worker;

/// Why the dashboard closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Quit,
    /// Logged out or the session expired. Carries the reason to show on the login screen.
    SignedOut(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
    #[default]
    List,
    Title,
    Description,
    Priority,
}

impl Focus {
    fn next_field(self) -> Self {
        match self {
            Focus::Title => Focus::Description,
            Focus::Description => Focus::Priority,
            Focus::Priority | Focus::List => Focus::Title,
        }
    }
}

#[derive(Debug)]
struct Ui {
    focus: Focus,
    selected: usize,
    show_help: bool,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            focus: Focus::List,
            selected: 0,
            show_help: true,
        }
    }
}

impl Ui {
    fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn selected_id<S: TokenStore>(&self, ctl: &TaskListController<S>) -> Option<TaskId> {
        ctl.tasks().get(self.selected).map(|t| t.id)
    }
}

enum Step {
    Continue(Option<Request>),
    Quit,
}

pub fn run(api: Arc<HttpApi>, session: Session<FileTokenStore>) -> Result<(Exit, Session<FileTokenStore>)> {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = std::sync::mpsc::channel();
    let worker = tokio::spawn(run_worker(api, req_rx, resp_tx));

    let mut ctl = TaskListController::new(session);
    send(&req_tx, ctl.mount());

    enable_raw_mode()?;
    let restore = OnDrop(restore_terminal);
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = dashboard_loop(&mut terminal, &mut ctl, &req_tx, &resp_rx);
    drop(restore);

    drop(req_tx);
    worker.abort();

    let exit = res?;
    Ok((exit, ctl.into_session()))
}

/// Runs its closure when dropped, including on early `?` returns.
struct OnDrop<F: FnMut()>(F);

impl<F: FnMut()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        (self.0)()
    }
}

fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        tracing::warn!(error = %e, "could not leave raw mode");
    }
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, LeaveAlternateScreen, Show) {
        tracing::warn!(error = %e, "could not leave alternate screen");
    }
}

fn send(tx: &mpsc::UnboundedSender<Request>, req: Option<Request>) {
    if let Some(r) = req {
        if tx.send(r).is_err() {
            tracing::warn!("request worker stopped");
        }
    }
}

fn dashboard_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ctl: &mut TaskListController<FileTokenStore>,
    requests: &mpsc::UnboundedSender<Request>,
    responses: &std::sync::mpsc::Receiver<Response>,
) -> Result<Exit> {
    let mut ui = Ui::default();
    let mut list_state = ListState::default();

    loop {
        while let Ok(resp) = responses.try_recv() {
            let next = ctl.apply(resp);
            send(requests, next);
        }

        if ctl.route() == Route::Login {
            let reason = match ctl.phase() {
                Phase::Error(msg) => Some(msg.clone()),
                _ => None,
            };
            return Ok(Exit::SignedOut(reason));
        }

        ui.clamp(ctl.tasks().len());
        list_state.select((!ctl.tasks().is_empty()).then_some(ui.selected));
        terminal.draw(|f| draw(f, &ui, ctl, &mut list_state))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match on_key(&mut ui, ctl, key)? {
                    Step::Quit => return Ok(Exit::Quit),
                    Step::Continue(req) => send(requests, req),
                }
            }
        }
    }
}

fn on_key<S: TokenStore>(ui: &mut Ui, ctl: &mut TaskListController<S>, key: KeyEvent) -> Result<Step> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(Step::Quit);
    }
    if ui.focus != Focus::List {
        return Ok(Step::Continue(on_form_key(ui, ctl, key.code)));
    }

    let req = match key.code {
        KeyCode::Char('q') => return Ok(Step::Quit),
        KeyCode::Char('?') => {
            ui.show_help = !ui.show_help;
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            ui.selected = ui.selected.saturating_add(1);
            ui.clamp(ctl.tasks().len());
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            ui.selected = ui.selected.saturating_sub(1);
            None
        }
        KeyCode::Char(' ') => ui.selected_id(ctl).and_then(|id| ctl.toggle(id)),
        KeyCode::Char('d') => ui.selected_id(ctl).and_then(|id| ctl.delete(id)),
        KeyCode::Char('e') | KeyCode::Enter => {
            if let Some(id) = ui.selected_id(ctl) {
                if ctl.begin_edit(id) {
                    ui.focus = Focus::Title;
                }
            }
            None
        }
        KeyCode::Char('n') => {
            if ctl.form().is_editing() {
                ctl.cancel_edit();
            }
            ui.focus = Focus::Title;
            None
        }
        KeyCode::Char('f') => ctl.set_status_filter(ctl.filters().status.next()),
        KeyCode::Char('p') => ctl.set_priority_filter(ctl.filters().priority.next()),
        KeyCode::Char('r') => ctl.refresh(),
        KeyCode::Char('x') => {
            ctl.dismiss_notice();
            None
        }
        KeyCode::Char('L') => {
            ctl.logout()?;
            None
        }
        _ => None,
    };
    Ok(Step::Continue(req))
}

fn on_form_key<S: TokenStore>(ui: &mut Ui, ctl: &mut TaskListController<S>, code: KeyCode) -> Option<Request> {
    match code {
        KeyCode::Esc => {
            if ctl.form().is_editing() {
                ctl.cancel_edit();
            }
            ui.focus = Focus::List;
            None
        }
        KeyCode::Tab => {
            ui.focus = ui.focus.next_field();
            None
        }
        KeyCode::Enter => match ctl.submit() {
            Ok(req) => {
                ui.focus = Focus::List;
                req
            }
            // the controller already carries the validation notice
            Err(SubmitError::Invalid(_)) => None,
            Err(SubmitError::InFlight) => None,
        },
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if ui.focus == Focus::Priority => {
            let draft = ctl.draft_mut();
            draft.priority = draft.priority.next();
            None
        }
        KeyCode::Backspace => {
            match ui.focus {
                Focus::Title => {
                    ctl.draft_mut().title.pop();
                }
                Focus::Description => {
                    ctl.draft_mut().description.pop();
                }
                _ => {}
            }
            None
        }
        KeyCode::Char(c) => {
            match ui.focus {
                Focus::Title => ctl.draft_mut().title.push(c),
                Focus::Description => ctl.draft_mut().description.push(c),
                _ => {}
            }
            None
        }
        _ => None,
    }
}

fn priority_color(p: Option<Priority>) -> Color {
    match p {
        Some(Priority::High) => Color::Red,
        Some(Priority::Medium) => Color::Yellow,
        Some(Priority::Low) => Color::Green,
        None => Color::Gray,
    }
}

fn draw<S: TokenStore>(f: &mut Frame, ui: &Ui, ctl: &TaskListController<S>, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    // header: filters and load state
    let filters = ctl.filters();
    let status = match ctl.phase() {
        Phase::Loading => Span::styled("Loading tasks...", Style::default().fg(Color::Cyan)),
        Phase::Error(msg) => Span::styled(msg.clone(), Style::default().fg(Color::Red)),
        Phase::Ready if ctl.is_busy() => Span::styled("Syncing...", Style::default().fg(Color::Gray)),
        Phase::Ready => Span::styled(
            format!("{} task(s)", ctl.tasks().len()),
            Style::default().fg(Color::Gray),
        ),
    };
    let mut header_lines = vec![
        Line::from(vec![
            Span::styled(
                "JustDoIt",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::raw(format!("Status: {}  Priority: {}", filters.status, filters.priority)),
        ]),
        Line::from(status),
    ];
    if let Some(notice) = ctl.notice() {
        header_lines.push(Line::from(Span::styled(
            format!("{notice} (x to dismiss)"),
            Style::default().fg(Color::Red),
        )));
    }
    let header = Paragraph::new(Text::from(header_lines)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    // form
    let form = ctl.form();
    let draft = &form.draft;
    let field = |focus: Focus, label: &str, value: String| {
        let style = if ui.focus == focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let cursor = if ui.focus == focus && focus != Focus::Priority { "_" } else { "" };
        Line::from(vec![
            Span::styled(format!("{label:<13}"), style),
            Span::raw(format!("{value}{cursor}")),
        ])
    };
    let button = if ctl.is_submitting() {
        "Saving..."
    } else if form.is_editing() {
        "[ Save Changes ]"
    } else {
        "[ Add Task ]"
    };
    let form_lines = vec![
        field(Focus::Title, "Title", draft.title.clone()),
        field(Focus::Description, "Description", draft.description.clone()),
        field(Focus::Priority, "Priority", draft.priority.label().to_string()),
        Line::from(Span::styled(button, Style::default().add_modifier(Modifier::BOLD))),
    ];
    let form_title = match form.editing_id() {
        Some(id) => format!("Edit Task #{id}"),
        None => "Add Task".to_string(),
    };
    let form_widget = Paragraph::new(Text::from(form_lines))
        .block(Block::default().borders(Borders::ALL).title(form_title));
    f.render_widget(form_widget, chunks[1]);

    // list
    let list_block = Block::default().borders(Borders::ALL).title("tasks");
    if ctl.tasks().is_empty() {
        let msg = match ctl.phase() {
            Phase::Ready => "No tasks yet. Time to relax!",
            _ => "",
        };
        f.render_widget(Paragraph::new(msg).block(list_block), chunks[2]);
    } else {
        let items: Vec<ListItem> = ctl
            .tasks()
            .iter()
            .map(|t| {
                let title_style = if t.completed {
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default()
                };
                let mut lines = vec![Line::from(vec![
                    Span::raw(if t.completed { "[x] " } else { "[ ] " }),
                    Span::styled(t.title.clone(), title_style),
                    Span::raw("  "),
                    Span::styled(
                        Priority::badge(t.priority),
                        Style::default().fg(priority_color(t.priority)),
                    ),
                ])];
                if let Some(d) = t.description.as_deref().filter(|d| !d.trim().is_empty()) {
                    lines.push(Line::from(Span::styled(
                        format!("    {}", d.trim()),
                        Style::default().fg(Color::Gray),
                    )));
                }
                ListItem::new(lines)
            })
            .collect();
        let list = List::new(items)
            .block(list_block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        f.render_stateful_widget(list, chunks[2], list_state);
    }

    let help = if !ui.show_help {
        "? help".to_string()
    } else if ui.focus == Focus::List {
        "j/k move  space toggle  e edit  n new  d delete  f status  p priority  r refresh  L logout  q quit"
            .to_string()
    } else {
        "Tab next field  space/←/→ priority  Enter save  Esc cancel".to_string()
    };
    let footer = Paragraph::new(help)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(footer, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use justdoit_core::{
        Filters, MemoryTokenStore, NewTask, Op, PriorityFilter, Reply, StatusFilter, Task,
        TaskPatch,
    };

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(ui: &mut Ui, ctl: &mut TaskListController<MemoryTokenStore>, code: KeyCode) -> Option<Request> {
        match on_key(ui, ctl, key(code)).unwrap() {
            Step::Continue(req) => req,
            Step::Quit => panic!("unexpected quit"),
        }
    }

    fn loaded(tasks: Vec<Task>) -> TaskListController<MemoryTokenStore> {
        let mut ctl = TaskListController::new(Session::new(MemoryTokenStore::with_token("t")));
        let req = ctl.mount().unwrap();
        assert!(ctl.apply(Response {
            seq: req.seq,
            reply: Reply::Fetched(Ok(tasks)),
        })
        .is_none());
        ctl
    }

    #[test]
    fn terminal_restore_runs_when_setup_fails_midway() {
        use std::cell::Cell;

        fn setup(restored: &Cell<bool>) -> Result<()> {
            let _restore = OnDrop(|| restored.set(true));
            anyhow::bail!("alternate screen unavailable")
        }

        let restored = Cell::new(false);
        assert!(setup(&restored).is_err());
        assert!(restored.get());
    }

    #[test]
    fn typing_a_title_and_enter_creates_a_task() {
        let mut ctl = loaded(vec![]);
        let mut ui = Ui::default();

        assert!(press(&mut ui, &mut ctl, KeyCode::Char('n')).is_none());
        assert_eq!(ui.focus, Focus::Title);
        for c in "Milk".chars() {
            press(&mut ui, &mut ctl, KeyCode::Char(c));
        }
        press(&mut ui, &mut ctl, KeyCode::Tab);
        press(&mut ui, &mut ctl, KeyCode::Tab);
        press(&mut ui, &mut ctl, KeyCode::Char(' '));

        let req = press(&mut ui, &mut ctl, KeyCode::Enter).unwrap();
        assert_eq!(
            req.op,
            Op::Create(NewTask {
                title: "Milk".into(),
                description: String::new(),
                priority: Priority::Medium,
            })
        );
        assert_eq!(ui.focus, Focus::List);
    }

    #[test]
    fn blank_title_stays_in_the_form() {
        let mut ctl = loaded(vec![]);
        let mut ui = Ui::default();
        press(&mut ui, &mut ctl, KeyCode::Char('n'));
        assert!(press(&mut ui, &mut ctl, KeyCode::Enter).is_none());
        assert_eq!(ui.focus, Focus::Title);
        assert_eq!(ctl.notice(), Some("Title is required."));
    }

    #[test]
    fn space_toggles_the_selected_task() {
        let mut ctl = loaded(vec![Task::new(1, "a"), Task::new(2, "b")]);
        let mut ui = Ui::default();
        press(&mut ui, &mut ctl, KeyCode::Char('j'));
        press(&mut ui, &mut ctl, KeyCode::Char('j'));
        assert_eq!(ui.selected, 1);

        let req = press(&mut ui, &mut ctl, KeyCode::Char(' ')).unwrap();
        assert_eq!(req.op, Op::Update(TaskId(2), TaskPatch::completed(true)));
    }

    #[test]
    fn filter_keys_refetch_with_the_next_filter() {
        let mut ctl = loaded(vec![]);
        let mut ui = Ui::default();

        let req = press(&mut ui, &mut ctl, KeyCode::Char('f')).unwrap();
        assert_eq!(
            req.op,
            Op::Fetch(Filters::new(StatusFilter::Completed, PriorityFilter::All))
        );
        let req = press(&mut ui, &mut ctl, KeyCode::Char('p')).unwrap();
        assert_eq!(
            req.op,
            Op::Fetch(Filters::new(
                StatusFilter::Completed,
                PriorityFilter::Only(Priority::High)
            ))
        );
    }

    #[test]
    fn escape_abandons_an_edit() {
        let mut ctl = loaded(vec![Task::new(7, "old")]);
        let mut ui = Ui::default();
        press(&mut ui, &mut ctl, KeyCode::Char('e'));
        assert_eq!(ctl.form().editing_id(), Some(TaskId(7)));
        assert_eq!(ctl.form().draft.title, "old");

        press(&mut ui, &mut ctl, KeyCode::Esc);
        assert!(!ctl.form().is_editing());
        assert!(ctl.form().draft.title.is_empty());
        assert_eq!(ui.focus, Focus::List);
    }

    #[test]
    fn logout_key_leaves_for_login() {
        let mut ctl = loaded(vec![]);
        let mut ui = Ui::default();
        press(&mut ui, &mut ctl, KeyCode::Char('L'));
        assert_eq!(ctl.route(), Route::Login);
        assert!(!ctl.session().is_signed_in());
    }

    #[test]
    fn q_quits_only_outside_the_form() {
        let mut ctl = loaded(vec![]);
        let mut ui = Ui::default();
        press(&mut ui, &mut ctl, KeyCode::Char('n'));
        press(&mut ui, &mut ctl, KeyCode::Char('q'));
        assert_eq!(ctl.form().draft.title, "q");
        press(&mut ui, &mut ctl, KeyCode::Esc);
        assert!(matches!(on_key(&mut ui, &mut ctl, key(KeyCode::Char('q'))).unwrap(), Step::Quit));
    }
}
