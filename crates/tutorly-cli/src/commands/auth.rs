// Authentication and profile commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use tutorly_core::{validation, Identity, ProfileUpdate, Role, UserDirectory};

use super::Context;
use crate::output::print_field;

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Sign in with email and password
    Login {
        email: String,

        /// Password (prefer the env var over the flag)
        #[arg(long, env = "TUTORLY_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a student account
    Register {
        email: String,

        #[arg(long, env = "TUTORLY_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Profile photo URL
        #[arg(long)]
        photo_url: Option<String>,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Show the signed-in user and their role
    Whoami,

    /// Update display name and/or photo
    Profile {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        photo_url: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct Whoami {
    #[serde(flatten)]
    identity: Identity,
    role: Option<Role>,
}

pub async fn run(command: AuthCommand, ctx: &Context<'_>) -> Result<()> {
    match command {
        AuthCommand::Login { email, password } => login(ctx, &email, &password).await,
        AuthCommand::Register {
            email,
            password,
            name,
            photo_url,
        } => register(ctx, &email, &password, name, photo_url).await,
        AuthCommand::Logout => logout(ctx).await,
        AuthCommand::Whoami => whoami(ctx).await,
        AuthCommand::Profile { name, photo_url } => profile(ctx, name, photo_url).await,
    }
}

async fn login(ctx: &Context<'_>, email: &str, password: &str) -> Result<()> {
    validation::email(email)?;
    let identity = ctx.app.session().sign_in(email, password).await?;
    ctx.say(format!("Signed in as {}", identity.label()));
    ctx.output.print_value(&identity)
}

async fn register(
    ctx: &Context<'_>,
    email: &str,
    password: &str,
    name: String,
    photo_url: Option<String>,
) -> Result<()> {
    validation::email(email)?;
    validation::password(password)?;

    let mut profile = ProfileUpdate::new().display_name(name);
    if let Some(url) = photo_url {
        profile = profile.photo_url(url);
    }

    let identity = ctx.app.session().sign_up(email, password, &profile).await?;
    ctx.say(format!("Registered {} as a student", identity.email));
    ctx.output.print_value(&identity)
}

async fn logout(ctx: &Context<'_>) -> Result<()> {
    let was_signed_in = ctx.app.session().identity().is_some();
    ctx.app.session().sign_out().await?;
    ctx.say(if was_signed_in {
        "Signed out"
    } else {
        "Not signed in"
    });
    Ok(())
}

async fn whoami(ctx: &Context<'_>) -> Result<()> {
    let identity = ctx.signed_in()?;
    let role = ctx
        .app
        .users()
        .find_by_email(&identity.email)
        .await?
        .map(|record| record.role);

    if ctx.output.is_text() {
        print_field("Email", &identity.email);
        print_field("Name", identity.display_name.as_deref().unwrap_or("-"));
        print_field("Photo", identity.photo_url.as_deref().unwrap_or("-"));
        print_field("Role", role.map(|r| r.as_str()).unwrap_or("-"));
    } else {
        ctx.output.print_value(&Whoami { identity, role })?;
    }
    Ok(())
}

async fn profile(ctx: &Context<'_>, name: Option<String>, photo_url: Option<String>) -> Result<()> {
    ctx.signed_in()?;
    let update = ProfileUpdate {
        display_name: name,
        photo_url,
    };
    if update.is_empty() {
        anyhow::bail!("Nothing to update: pass --name and/or --photo-url");
    }

    let identity = ctx.app.session().update_profile(&update).await?;
    ctx.say(format!("Profile updated for {}", identity.email));
    ctx.output.print_value(&identity)
}
