use chrono::{DateTime, Utc};
use std::fmt;

use crate::errors::ClientError;

/// Identity of the logged-in learner, populated at login and cleared at logout
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    current: Option<ActiveSession>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub user_id: String,
    pub email: String,
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, user_id: impl Into<String>, email: impl Into<String>) {
        let session = ActiveSession {
            user_id: user_id.into(),
            email: email.into(),
            started_at: Utc::now(),
        };
        tracing::info!(user_id = %session.user_id, "Session started");
        self.current = Some(session);
    }

    /// Logout. Returns the session that was active, if any.
    pub fn end(&mut self) -> Option<ActiveSession> {
        let ended = self.current.take();
        if let Some(session) = &ended {
            tracing::info!(user_id = %session.user_id, "Session ended");
        }
        ended
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.current.as_ref()
    }

    pub fn user_id(&self) -> Result<&str, ClientError> {
        self.current
            .as_ref()
            .map(|session| session.user_id.as_str())
            .ok_or(ClientError::NoSession)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Register,
    Dashboard,
    Class(String),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Root => f.write_str("/"),
            Route::Login => f.write_str("/login"),
            Route::Register => f.write_str("/register"),
            Route::Dashboard => f.write_str("/dashboard"),
            Route::Class(id) => write!(f, "/class/{}", id),
        }
    }
}

/// Resolve where a navigation actually lands given the session state.
///
/// Without a session everything but the auth pages goes to login; with one,
/// the root forwards to the dashboard.
pub fn guard_route(requested: Route, session: &SessionContext) -> Route {
    match (requested, session.is_active()) {
        (route @ (Route::Login | Route::Register), false) => route,
        (_, false) => Route::Login,
        (Route::Root, true) => Route::Dashboard,
        (route, true) => route,
    }
}
