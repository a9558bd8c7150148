use anyhow::Result;
use clap::{Parser, Subcommand};
use justdoit_api::HttpApi;
use justdoit_core::{
    AuthMode, Filters, Navigator, Priority, PriorityFilter, Route, Session, StatusFilter, TaskId,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

mod auth;
mod commands;
mod config;
mod dashboard;
mod dashboard_worker;
mod logging;
mod state;

use auth::FileTokenStore;
use dashboard::Exit;

#[derive(Parser, Debug)]
#[command(
    name = "justdoit",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("JUSTDOIT_BUILD_SHA"), ")"),
    about = "Terminal client for the JustDoIt task service"
)]
struct Cli {
    /// Defaults to the interactive dashboard
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the access token
    Login {
        #[arg(long)]
        email: Option<String>,
    },

    /// Create an account (sign in afterwards)
    Register {
        #[arg(long)]
        email: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Show the account behind the stored token
    Whoami,

    /// Print tasks, optionally filtered
    List {
        /// all | completed | pending
        #[arg(long, default_value = "all")]
        status: StatusFilter,

        /// all | low | medium | high
        #[arg(long, default_value = "all")]
        priority: PriorityFilter,
    },

    /// Print one task with timestamps
    Show { id: TaskId },

    /// Create a task
    Add {
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// low | medium | high
        #[arg(long, default_value = "low")]
        priority: Priority,
    },

    /// Change fields of an existing task
    Edit {
        id: TaskId,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        priority: Option<Priority>,
    },

    /// Flip a task between pending and completed
    Toggle { id: TaskId },

    /// Delete a task
    Delete { id: TaskId },

    /// Interactive dashboard (TTY required)
    Dashboard,

    /// Config file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.justdoit/config.toml with defaults if missing
    Init,

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config()?;
    let _guard = match logging::init_logging(&cfg.log.level) {
        Ok(g) => Some(g),
        Err(e) => {
            eprintln!("warning: logging disabled: {e:#}");
            None
        }
    };
    tracing::debug!(base_url = %cfg.base_url(), "starting");

    let command = match cli.command.unwrap_or(Command::Dashboard) {
        Command::Config { command } => {
            return match command {
                ConfigCommand::Init => config::init_config(),
                ConfigCommand::Show => config::show_config(),
            };
        }
        other => other,
    };

    let api = HttpApi::with_timeout(cfg.base_url(), cfg.timeout())?;
    let mut session = auth::open_session()?;

    match command {
        Command::Login { email } => {
            let mut nav = Navigator::start(false);
            auth::run_auth(&api, AuthMode::Login, email, &mut session, &mut nav).await?;
        }
        Command::Register { email } => {
            let mut nav = Navigator::start(false);
            nav.go(Route::Register, false);
            auth::run_auth(&api, AuthMode::Register, email, &mut session, &mut nav).await?;
        }
        Command::Logout => auth::logout(&mut session)?,
        Command::Whoami => auth::whoami(&api, &mut session).await?,
        Command::List { status, priority } => {
            commands::list(&api, session, Filters::new(status, priority)).await?
        }
        Command::Show { id } => commands::show(&api, session, id).await?,
        Command::Add {
            title,
            description,
            priority,
        } => commands::add(&api, session, title, description, priority).await?,
        Command::Edit {
            id,
            title,
            description,
            priority,
        } => commands::edit(&api, session, id, title, description, priority).await?,
        Command::Toggle { id } => commands::toggle(&api, session, id).await?,
        Command::Delete { id } => commands::delete(&api, session, id).await?,
        Command::Dashboard => run_app(api, session).await?,
        Command::Config { .. } => {}
    }

    Ok(())
}

/// Screen loop: auth screens on stdin, the dashboard in the alternate screen.
async fn run_app(api: HttpApi, mut session: Session<FileTokenStore>) -> Result<()> {
    let api = Arc::new(api);
    let mut nav = Navigator::start(session.is_signed_in());

    loop {
        match nav.current() {
            Route::Login | Route::Register => {
                let mode = if nav.current() == Route::Register {
                    AuthMode::Register
                } else {
                    AuthMode::Login
                };
                match auth::run_auth(&api, mode, None, &mut session, &mut nav).await {
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("{e:#}");
                        if !ask_retry(mode, &mut nav, &mut io::stdin().lock())? {
                            return Ok(());
                        }
                    }
                }
            }
            Route::Dashboard => {
                let api = Arc::clone(&api);
                let (exit, back) = tokio::task::block_in_place(|| dashboard::run(api, session))?;
                session = back;
                match exit {
                    Exit::Quit => return Ok(()),
                    Exit::SignedOut(Some(reason)) => nav.redirect_to_login(reason),
                    Exit::SignedOut(None) => {
                        nav.go(Route::Login, false);
                        println!("Signed out.\n");
                    }
                }
            }
        }
    }
}

/// After a failed attempt. Returns false when the user wants out or stdin is closed.
fn ask_retry(mode: AuthMode, nav: &mut Navigator, input: &mut impl BufRead) -> Result<bool> {
    let (label, other) = match mode {
        AuthMode::Login => ("register", Route::Register),
        AuthMode::Register => ("log in", Route::Login),
    };
    print!("[r]etry, [s]witch to {label}, or [q]uit: ");
    io::stdout().flush().ok();
    let Some(answer) = auth::read_answer(input)? else {
        println!();
        return Ok(false);
    };
    match answer.trim() {
        "" | "r" => Ok(true),
        "s" => {
            nav.go(other, false);
            Ok(true)
        }
        _ => Ok(false),
    }
}
