//! Navigation: the outer layer that reacts to session expiry.
//!
//! SYSTEM CONTEXT
//! ==============
//! The gateway only publishes [`SessionEvent::Expired`]; this module owns the
//! "must end up at login" reaction and the guard that pages apply before
//! rendering anything session-bound.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::gateway::SessionEvent;
use crate::session::SessionStore;

/// Client-side destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Product(String),
}

impl Route {
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".to_owned(),
            Self::Dashboard => "/dashboard".to_owned(),
            Self::Product(id) => format!("/products/{id}"),
        }
    }
}

/// Something that can move the client to a route.
pub trait Navigator: Send + Sync {
    /// Go to `route`. Returns `false` when already there, in which case
    /// nothing happens.
    fn navigate(&self, route: Route) -> bool;
}

/// Tracks the current route; navigating to it again is a no-op.
#[derive(Debug)]
pub struct Router {
    current: Mutex<Route>,
}

impl Router {
    #[must_use]
    pub fn new(initial: Route) -> Self {
        Self { current: Mutex::new(initial) }
    }

    #[must_use]
    pub fn current(&self) -> Route {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for Router {
    fn navigate(&self, route: Route) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == route {
            return false;
        }
        tracing::debug!(from = %current.path(), to = %route.path(), "navigating");
        *current = route;
        true
    }
}

/// Redirect to login unless a session exists. Returns whether the caller may
/// proceed.
pub fn require_session(session: &SessionStore, navigator: &dyn Navigator) -> bool {
    if session.is_authenticated() {
        return true;
    }
    navigator.navigate(Route::Login);
    false
}

/// Route to login every time the gateway reports an expired session.
///
/// Runs until the gateway (the sender) is dropped.
pub fn watch_session_expiry(
    mut events: broadcast::Receiver<SessionEvent>,
    navigator: Arc<dyn Navigator>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Expired) => {
                    if navigator.navigate(Route::Login) {
                        tracing::info!("session expired; redirected to login");
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "session events lagged");
                    navigator.navigate(Route::Login);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "navigation_test.rs"]
mod tests;
