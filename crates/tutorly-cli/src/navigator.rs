// Navigation for a one-shot process
//
// Decision: A redirect ends the command; the destination picks the exit code

use std::process::ExitCode;
use std::sync::{Mutex, PoisonError};

use tutorly_core::{Destination, Navigator, Redirect};

/// Exit code when the user lacks the role for a command
pub const EXIT_FORBIDDEN: u8 = 3;
/// Exit code when the user has to sign in (again)
pub const EXIT_LOGIN: u8 = 2;

/// Remembers the most recent redirect
#[derive(Debug, Default)]
pub struct CliNavigator {
    last: Mutex<Option<Redirect>>,
}

impl CliNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Redirect> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for CliNavigator {
    fn navigate(&self, redirect: Redirect) {
        tracing::debug!(%redirect, "Redirecting");
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(redirect);
    }
}

pub fn exit_code(destination: Destination) -> ExitCode {
    match destination {
        Destination::Forbidden => ExitCode::from(EXIT_FORBIDDEN),
        Destination::Login => ExitCode::from(EXIT_LOGIN),
    }
}

/// What to tell the user about a redirect
pub fn explain(redirect: &Redirect) -> String {
    match redirect.to {
        Destination::Forbidden => format!(
            "Forbidden: your account cannot access {} ({})",
            redirect.from,
            redirect.to.path()
        ),
        Destination::Login => format!(
            "Session expired while requesting {}. Run `tutorly auth login` ({})",
            redirect.from,
            redirect.to.path()
        ),
    }
}
