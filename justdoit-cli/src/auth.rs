use anyhow::{Context, Result, bail};
use justdoit_api::HttpApi;
use justdoit_core::{
    AuthFlow, AuthMode, AuthState, BearerToken, Credentials, Navigator, Route, Session, TaskApi,
    TokenStore,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::state::ensure_justdoit_home;

/// On-disk shape of `auth.json`; the token lives under the fixed key "token".
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct AuthFile {
    token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::at(ensure_justdoit_home()?.join("auth.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, file: &AuthFile) -> Result<()> {
        let s = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, s).with_context(|| format!("write {}", self.path.display()))?;
        restrict_permissions(&self.path)
    }
}

#[cfg(unix)]
fn restrict_permissions(p: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(p, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("chmod {}", p.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_p: &Path) -> Result<()> {
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn save(&mut self, token: &BearerToken) -> Result<()> {
        self.write(&AuthFile {
            token: Some(token.as_str().to_string()),
        })
    }

    fn read(&self) -> Result<Option<BearerToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        let file: AuthFile =
            serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))?;
        Ok(file
            .token
            .filter(|t| !t.trim().is_empty())
            .map(BearerToken::new))
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}

/// Session over the default token file. A rejected token is logged when dropped.
pub fn open_session() -> Result<Session<FileTokenStore>> {
    let store = FileTokenStore::default_location()?;
    Ok(Session::new(store).on_invalidate(|| {
        tracing::warn!("backend rejected the stored token; it has been removed");
    }))
}

/// One line from `input` without its line ending. `None` once the input is closed.
pub fn read_answer(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut s = String::new();
    if input.read_line(&mut s)? == 0 {
        return Ok(None);
    }
    Ok(Some(s.trim_end_matches(['\r', '\n']).to_string()))
}

fn prompt(label: &str, input: &mut impl BufRead) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    match read_answer(input)? {
        Some(s) => Ok(s.trim().to_string()),
        None => bail!("input closed before {label} was entered"),
    }
}

fn prompt_secret(label: &str, input: &mut impl BufRead) -> Result<String> {
    // Plain stdin; the terminal will echo.
    print!("{}: ", label);
    io::stdout().flush().ok();
    match read_answer(input)? {
        Some(s) => Ok(s),
        None => bail!("input closed before {label} was entered"),
    }
}

fn read_credentials(email: Option<String>, input: &mut impl BufRead) -> Result<Credentials> {
    let email = match email {
        Some(e) => e,
        None => prompt("Email", input)?,
    };
    let password = prompt_secret("Password", input)?;
    Ok(Credentials::new(email.trim(), password))
}

/// Run one login or registration attempt. Returns the route to show next.
pub async fn run_auth(
    api: &HttpApi,
    mode: AuthMode,
    email: Option<String>,
    session: &mut Session<FileTokenStore>,
    nav: &mut Navigator,
) -> Result<Route> {
    let title = match mode {
        AuthMode::Login => "Login",
        AuthMode::Register => "Register",
    };
    println!("{title}\n");
    if let Some(flash) = nav.take_flash() {
        println!("{flash}\n");
    }

    let creds = read_credentials(email, &mut io::stdin().lock())?;
    let mut flow = AuthFlow::new(mode);
    match flow.submit(api, &creds, session, nav).await? {
        AuthState::Success => {
            match mode {
                AuthMode::Login => println!("Signed in as {}", creds.email),
                AuthMode::Register => {
                    if let Some(flash) = nav.take_flash() {
                        println!("{flash}");
                    }
                }
            }
            Ok(nav.current())
        }
        AuthState::Failure(msg) => bail!("{msg}"),
        other => bail!("unexpected auth state: {other:?}"),
    }
}

pub fn logout(session: &mut Session<FileTokenStore>) -> Result<()> {
    session.sign_out()?;
    println!("Signed out (removed {})", session.store().path().display());
    Ok(())
}

pub async fn whoami(api: &HttpApi, session: &mut Session<FileTokenStore>) -> Result<()> {
    let token = match session.bearer() {
        Ok(t) => t,
        Err(_) => bail!("Not signed in. Run: justdoit login"),
    };
    match api.me(&token).await {
        Ok(account) => {
            println!("{} (id {})", account.email, account.id);
            Ok(())
        }
        Err(e) if e.is_unauthenticated() => {
            session.invalidate()?;
            bail!("Session expired. Run: justdoit login")
        }
        Err(e) => Err(e).context("GET /auth/me"),
    }
}
