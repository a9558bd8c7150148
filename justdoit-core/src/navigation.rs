//! Which screen runs next.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
}

/// The dashboard needs a token; the auth screens are always reachable when asked for.
pub fn resolve(requested: Route, signed_in: bool) -> Route {
    match requested {
        Route::Dashboard if !signed_in => Route::Login,
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    current: Route,
    flash: Option<String>,
}

impl Navigator {
    /// Startup: a stored token goes straight to the dashboard.
    pub fn start(signed_in: bool) -> Self {
        let current = if signed_in { Route::Dashboard } else { Route::Login };
        Self {
            current,
            flash: None,
        }
    }

    pub fn current(&self) -> Route {
        self.current
    }

    pub fn go(&mut self, requested: Route, signed_in: bool) -> Route {
        self.current = resolve(requested, signed_in);
        self.current
    }

    /// Send the user back to login with a reason to show there.
    pub fn redirect_to_login(&mut self, reason: impl Into<String>) {
        self.current = Route::Login;
        self.flash = Some(reason.into());
    }

    pub fn set_flash(&mut self, message: impl Into<String>) {
        self.flash = Some(message.into());
    }

    pub fn take_flash(&mut self) -> Option<String> {
        self.flash.take()
    }
}
