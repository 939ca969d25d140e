// CLI command handlers

pub mod admin;
pub mod auth;
pub mod classes;
pub mod student;
pub mod teacher;

use anyhow::{bail, Context as _, Result};
use tutorly_client::TutorlyApp;
use tutorly_core::{GuardDecision, Identity, Redirect, RouteGuard};

use crate::output::OutputFormat;

/// A guarded command was turned away; the redirect has been issued
#[derive(Debug, thiserror::Error)]
#[error("Access to {location} denied: {redirect}")]
pub struct Denied {
    pub location: String,
    pub redirect: Redirect,
}

/// Shared state every command handler receives
pub struct Context<'a> {
    pub app: &'a TutorlyApp,
    pub output: OutputFormat,
    pub quiet: bool,
}

impl Context<'_> {
    /// Mount `guard` and wait for its decision
    ///
    /// Returns the signed-in identity when the route renders. A denial has
    /// already redirected; the error just stops the command.
    pub async fn require(&self, guard: RouteGuard) -> Result<Identity> {
        let location = guard.location().to_string();
        let mut route = self.app.mount(guard);

        match route.resolve().await {
            GuardDecision::Render => self
                .app
                .session()
                .identity()
                .context("Signed-in identity disappeared"),
            GuardDecision::Redirect(redirect) => Err(Denied { location, redirect }.into()),
            GuardDecision::Placeholder => bail!("Session never resolved for {}", location),
        }
    }

    /// The signed-in identity, for commands any role may run
    pub fn signed_in(&self) -> Result<Identity> {
        match self.app.session().identity() {
            Some(identity) => Ok(identity),
            None => bail!("Not signed in. Run `tutorly auth login` first"),
        }
    }

    pub fn say(&self, message: impl AsRef<str>) {
        if self.output.is_text() && !self.quiet {
            println!("{}", message.as_ref());
        }
    }
}
