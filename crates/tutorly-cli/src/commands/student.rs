// Student dashboard commands

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::Subcommand;
use std::sync::Arc;

use tutorly_client::PaymentGateway;
use tutorly_core::models::{Feedback, NewSubmission};
use tutorly_core::RouteGuard;

use super::Context;
use crate::output::{price, print_table_header, print_table_row};

#[derive(Subcommand)]
pub enum StudentCommand {
    /// Classes you are enrolled in
    Enrolled,

    /// Record a class payment confirmed with the payment provider
    Enroll {
        /// Class ID
        class_id: String,

        /// Transaction ID issued by the payment provider
        #[arg(long)]
        transaction_id: String,
    },

    /// Assignments of an enrolled class
    Assignments {
        /// Class ID
        class_id: String,
    },

    /// Submit work for an assignment
    Submit {
        /// Assignment ID
        assignment_id: String,

        /// Class the assignment belongs to
        #[arg(long)]
        class_id: String,

        /// Link to the work
        #[arg(long)]
        url: String,
    },

    /// Rate a class
    Feedback {
        /// Class ID
        class_id: String,

        /// Rating from 1 to 5
        #[arg(long)]
        rating: u8,

        #[arg(long)]
        description: String,
    },
}

/// Payment already confirmed out of band; hands back its transaction id
struct ConfirmedPayment {
    transaction_id: String,
}

#[async_trait]
impl PaymentGateway for ConfirmedPayment {
    async fn confirm(&self, _client_secret: &str, _amount: f64) -> tutorly_core::Result<String> {
        Ok(self.transaction_id.clone())
    }
}

pub async fn run(command: StudentCommand, ctx: &Context<'_>) -> Result<()> {
    match command {
        StudentCommand::Enrolled => enrolled(ctx).await,
        StudentCommand::Enroll {
            class_id,
            transaction_id,
        } => enroll(ctx, &class_id, transaction_id).await,
        StudentCommand::Assignments { class_id } => assignments(ctx, &class_id).await,
        StudentCommand::Submit {
            assignment_id,
            class_id,
            url,
        } => submit(ctx, &assignment_id, class_id, url).await,
        StudentCommand::Feedback {
            class_id,
            rating,
            description,
        } => feedback(ctx, class_id, rating, description).await,
    }
}

async fn enrolled(ctx: &Context<'_>) -> Result<()> {
    let student = ctx.require(RouteGuard::student("/dashboard/my-enroll")).await?;
    let enrollments = ctx.app.payments().enrollments(&student.email).await?;

    if !ctx.output.is_text() {
        return ctx.output.print_value(&enrollments);
    }
    if enrollments.is_empty() {
        println!("Not enrolled in any class");
        return Ok(());
    }

    print_table_header(&[("CLASS", 24), ("TITLE", 30), ("PAID", 9), ("DATE", 10)]);
    let classes = ctx.app.classes();
    for payment in &enrollments {
        let title = classes
            .get(&payment.class_id)
            .await?
            .map(|c| c.title)
            .unwrap_or_else(|| "-".to_string());
        print_table_row(&[
            (&payment.class_id, 24),
            (&title, 30),
            (&price(payment.price), 9),
            (&payment.paid_at.format("%Y-%m-%d").to_string(), 10),
        ]);
    }
    Ok(())
}

async fn enroll(ctx: &Context<'_>, class_id: &str, transaction_id: String) -> Result<()> {
    let student = ctx.signed_in()?;
    let Some(class) = ctx.app.classes().get(class_id).await? else {
        bail!("Class not found: {}", class_id);
    };

    let flow = ctx
        .app
        .enrollment(Arc::new(ConfirmedPayment { transaction_id }));
    let payment = flow.enroll(&class, &student).await?;

    ctx.say(format!(
        "Enrolled in {} ({}), transaction {}",
        class.title,
        price(payment.price),
        payment.transaction_id
    ));
    ctx.output.print_value(&payment)
}

async fn assignments(ctx: &Context<'_>, class_id: &str) -> Result<()> {
    ctx.require(RouteGuard::student(format!("/dashboard/my-enroll/{}", class_id)))
        .await?;
    let assignments = ctx.app.assignments().list(class_id).await?;

    if !ctx.output.is_text() {
        return ctx.output.print_value(&assignments);
    }
    if assignments.is_empty() {
        println!("No assignments yet");
        return Ok(());
    }

    print_table_header(&[("ID", 24), ("TITLE", 30), ("DEADLINE", 16), ("SUBMITTED", 9)]);
    for assignment in &assignments {
        print_table_row(&[
            (&assignment.id, 24),
            (&assignment.title, 30),
            (&assignment.deadline.format("%Y-%m-%d %H:%M").to_string(), 16),
            (&assignment.submission_count.to_string(), 9),
        ]);
    }
    Ok(())
}

async fn submit(ctx: &Context<'_>, assignment_id: &str, class_id: String, url: String) -> Result<()> {
    let student = ctx
        .require(RouteGuard::student(format!("/dashboard/my-enroll/{}", class_id)))
        .await?;

    let submission = NewSubmission {
        class_id,
        student_email: student.email,
        url,
    };
    let created = ctx.app.assignments().submit(assignment_id, &submission).await?;
    ctx.say(format!("Submitted {}", created.id));
    ctx.output.print_value(&created)
}

async fn feedback(ctx: &Context<'_>, class_id: String, rating: u8, description: String) -> Result<()> {
    let student = ctx
        .require(RouteGuard::student(format!("/dashboard/my-enroll/{}", class_id)))
        .await?;

    let feedback = Feedback {
        id: String::new(),
        class_id,
        student_name: student.display_name.clone(),
        student_email: student.email,
        rating,
        description,
    };
    ctx.app.feedback().submit(&feedback).await?;
    ctx.say("Thanks for your feedback");
    Ok(())
}
