// Admin dashboard commands

use anyhow::{bail, Result};
use clap::Subcommand;

use tutorly_core::models::{ClassStatus, RequestStatus};
use tutorly_core::{Role, RouteGuard};

use super::classes::print_class_table;
use super::Context;
use crate::output::{print_table_header, print_table_row};

#[derive(Subcommand)]
pub enum AdminCommand {
    /// List users
    Users {
        /// Match name or email
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Change a user's role
    SetRole {
        email: String,

        #[arg(long, value_parser = ["student", "teacher", "admin"])]
        role: String,
    },

    /// List classes by review state
    Classes {
        #[arg(long, default_value = "pending", value_parser = ["pending", "approved", "rejected", "all"])]
        status: String,
    },

    /// Approve a class
    Approve { class_id: String },

    /// Reject a class
    Reject { class_id: String },

    /// List teacher applications
    Requests,

    /// Accept or reject a teacher application
    Review {
        request_id: String,

        #[arg(long, value_parser = ["accept", "reject"])]
        decision: String,
    },
}

pub async fn run(command: AdminCommand, ctx: &Context<'_>) -> Result<()> {
    match command {
        AdminCommand::Users { search } => users(ctx, search.as_deref()).await,
        AdminCommand::SetRole { email, role } => set_role(ctx, &email, &role).await,
        AdminCommand::Classes { status } => classes(ctx, &status).await,
        AdminCommand::Approve { class_id } => {
            review_class(ctx, &class_id, ClassStatus::Approved).await
        }
        AdminCommand::Reject { class_id } => {
            review_class(ctx, &class_id, ClassStatus::Rejected).await
        }
        AdminCommand::Requests => requests(ctx).await,
        AdminCommand::Review {
            request_id,
            decision,
        } => review_request(ctx, &request_id, &decision).await,
    }
}

async fn users(ctx: &Context<'_>, search: Option<&str>) -> Result<()> {
    ctx.require(RouteGuard::admin("/dashboard/users")).await?;
    let users = ctx.app.users().list(search).await?;

    if !ctx.output.is_text() {
        return ctx.output.print_value(&users);
    }
    if users.is_empty() {
        println!("No users found");
        return Ok(());
    }

    print_table_header(&[("EMAIL", 32), ("NAME", 24), ("ROLE", 8)]);
    for user in &users {
        print_table_row(&[
            (&user.email, 32),
            (user.name.as_deref().unwrap_or("-"), 24),
            (user.role.as_str(), 8),
        ]);
    }
    Ok(())
}

async fn set_role(ctx: &Context<'_>, email: &str, role: &str) -> Result<()> {
    ctx.require(RouteGuard::admin("/dashboard/users")).await?;
    let Some(role) = Role::from_str(role) else {
        bail!("Unknown role: {}", role);
    };

    ctx.app.users().set_role(email, role).await?;
    ctx.say(format!("{} is now {}", email, role));
    Ok(())
}

async fn classes(ctx: &Context<'_>, status: &str) -> Result<()> {
    ctx.require(RouteGuard::admin("/dashboard/all-classes")).await?;
    let classes = ctx.app.classes().list(ClassStatus::from_str(status)).await?;

    if !ctx.output.is_text() {
        return ctx.output.print_value(&classes);
    }
    if classes.is_empty() {
        println!("No classes found");
    } else {
        print_class_table(&classes);
    }
    Ok(())
}

async fn review_class(ctx: &Context<'_>, class_id: &str, status: ClassStatus) -> Result<()> {
    ctx.require(RouteGuard::admin("/dashboard/all-classes")).await?;
    ctx.app.classes().set_status(class_id, status).await?;
    ctx.say(format!("Class {} {}", class_id, status.as_str()));
    Ok(())
}

async fn requests(ctx: &Context<'_>) -> Result<()> {
    ctx.require(RouteGuard::admin("/dashboard/teacher-requests")).await?;
    let requests = ctx.app.teacher_requests().list().await?;

    if !ctx.output.is_text() {
        return ctx.output.print_value(&requests);
    }
    if requests.is_empty() {
        println!("No teacher requests");
        return Ok(());
    }

    print_table_header(&[
        ("ID", 24),
        ("NAME", 20),
        ("TITLE", 24),
        ("CATEGORY", 14),
        ("STATUS", 8),
    ]);
    for request in &requests {
        print_table_row(&[
            (&request.id, 24),
            (&request.name, 20),
            (&request.title, 24),
            (&request.category, 14),
            (request.status.as_str(), 8),
        ]);
    }
    Ok(())
}

async fn review_request(ctx: &Context<'_>, request_id: &str, decision: &str) -> Result<()> {
    ctx.require(RouteGuard::admin("/dashboard/teacher-requests")).await?;
    let status = match decision {
        "accept" => RequestStatus::Accepted,
        "reject" => RequestStatus::Rejected,
        other => bail!("Unknown decision: {}", other),
    };

    ctx.app.teacher_requests().review(request_id, status).await?;
    ctx.say(format!("Request {} {}", request_id, status.as_str()));
    Ok(())
}
