// Teacher dashboard commands

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;

use tutorly_core::models::{AssignmentDraft, ClassDraft, TeacherRequest};
use tutorly_core::RouteGuard;

use super::classes::print_class_table;
use super::Context;
use crate::output::{print_table_header, print_table_row};

#[derive(Subcommand)]
pub enum TeacherCommand {
    /// Apply to teach on the marketplace
    Apply {
        /// What you want to teach
        #[arg(long)]
        title: String,

        #[arg(long)]
        category: String,

        /// beginner, mid-level or experienced
        #[arg(long, default_value = "beginner")]
        experience: String,
    },

    /// Your classes
    Classes,

    /// Submit a new class for review
    CreateClass {
        #[arg(long)]
        title: String,

        #[arg(long)]
        price: f64,

        #[arg(long, default_value = "")]
        description: String,

        /// Cover image URL
        #[arg(long)]
        image: Option<String>,
    },

    /// Edit one of your classes
    UpdateClass {
        class_id: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        price: f64,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        image: Option<String>,
    },

    /// Delete one of your classes
    DeleteClass { class_id: String },

    /// Add an assignment to a class
    AddAssignment {
        class_id: String,

        #[arg(long)]
        title: String,

        /// RFC 3339 timestamp, e.g. 2026-11-30T23:59:00Z
        #[arg(long)]
        deadline: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Submissions for an assignment
    Submissions { assignment_id: String },

    /// Grade a submission
    Grade {
        submission_id: String,

        #[arg(long)]
        grade: f32,
    },
}

pub async fn run(command: TeacherCommand, ctx: &Context<'_>) -> Result<()> {
    match command {
        TeacherCommand::Apply {
            title,
            category,
            experience,
        } => apply(ctx, title, category, experience).await,
        TeacherCommand::Classes => classes(ctx).await,
        TeacherCommand::CreateClass {
            title,
            price,
            description,
            image,
        } => {
            let draft = ClassDraft {
                title,
                price,
                description,
                image,
            };
            create_class(ctx, &draft).await
        }
        TeacherCommand::UpdateClass {
            class_id,
            title,
            price,
            description,
            image,
        } => {
            let draft = ClassDraft {
                title,
                price,
                description,
                image,
            };
            update_class(ctx, &class_id, &draft).await
        }
        TeacherCommand::DeleteClass { class_id } => delete_class(ctx, &class_id).await,
        TeacherCommand::AddAssignment {
            class_id,
            title,
            deadline,
            description,
        } => add_assignment(ctx, &class_id, title, &deadline, description).await,
        TeacherCommand::Submissions { assignment_id } => submissions(ctx, &assignment_id).await,
        TeacherCommand::Grade {
            submission_id,
            grade: grade_value,
        } => grade(ctx, &submission_id, grade_value).await,
    }
}

async fn apply(ctx: &Context<'_>, title: String, category: String, experience: String) -> Result<()> {
    let identity = ctx.signed_in()?;
    let request = TeacherRequest {
        id: String::new(),
        name: identity.label().to_string(),
        email: identity.email.clone(),
        image: identity.photo_url.clone(),
        experience,
        title,
        category,
        status: Default::default(),
    };

    let created = ctx.app.teacher_requests().apply(&request).await?;
    ctx.say("Application submitted for review");
    ctx.output.print_value(&created)
}

async fn classes(ctx: &Context<'_>) -> Result<()> {
    let teacher = ctx.require(RouteGuard::teacher("/dashboard/my-class")).await?;
    let classes = ctx.app.classes().by_teacher(&teacher.email).await?;

    if !ctx.output.is_text() {
        return ctx.output.print_value(&classes);
    }
    if classes.is_empty() {
        println!("No classes yet");
    } else {
        print_class_table(&classes);
    }
    Ok(())
}

async fn create_class(ctx: &Context<'_>, draft: &ClassDraft) -> Result<()> {
    ctx.require(RouteGuard::teacher("/dashboard/add-class")).await?;
    let class = ctx.app.classes().create(draft).await?;
    ctx.say(format!("Created {} ({}), pending review", class.title, class.id));
    ctx.output.print_value(&class)
}

async fn update_class(ctx: &Context<'_>, class_id: &str, draft: &ClassDraft) -> Result<()> {
    ctx.require(RouteGuard::teacher(format!("/dashboard/my-class/{}", class_id)))
        .await?;
    let class = ctx.app.classes().update(class_id, draft).await?;
    ctx.say(format!("Updated {}", class.id));
    ctx.output.print_value(&class)
}

async fn delete_class(ctx: &Context<'_>, class_id: &str) -> Result<()> {
    ctx.require(RouteGuard::teacher("/dashboard/my-class")).await?;
    ctx.app.classes().delete(class_id).await?;
    ctx.say(format!("Deleted {}", class_id));
    Ok(())
}

async fn add_assignment(
    ctx: &Context<'_>,
    class_id: &str,
    title: String,
    deadline: &str,
    description: String,
) -> Result<()> {
    ctx.require(RouteGuard::teacher(format!("/dashboard/my-class/{}", class_id)))
        .await?;

    let deadline: DateTime<Utc> = DateTime::parse_from_rfc3339(deadline)
        .with_context(|| format!("Invalid deadline: {}", deadline))?
        .with_timezone(&Utc);
    let draft = AssignmentDraft {
        title,
        deadline,
        description,
    };

    let assignment = ctx.app.assignments().create(class_id, &draft).await?;
    ctx.say(format!("Added assignment {}", assignment.id));
    ctx.output.print_value(&assignment)
}

async fn submissions(ctx: &Context<'_>, assignment_id: &str) -> Result<()> {
    ctx.require(RouteGuard::teacher("/dashboard/my-class")).await?;
    let submissions = ctx.app.assignments().submissions(assignment_id).await?;

    if !ctx.output.is_text() {
        return ctx.output.print_value(&submissions);
    }
    if submissions.is_empty() {
        println!("No submissions yet");
        return Ok(());
    }

    print_table_header(&[("ID", 24), ("STUDENT", 28), ("URL", 40), ("GRADE", 5)]);
    for submission in &submissions {
        let grade = submission
            .grade
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string());
        print_table_row(&[
            (&submission.id, 24),
            (&submission.student_email, 28),
            (&submission.url, 40),
            (&grade, 5),
        ]);
    }
    Ok(())
}

async fn grade(ctx: &Context<'_>, submission_id: &str, grade: f32) -> Result<()> {
    ctx.require(RouteGuard::teacher("/dashboard/my-class")).await?;
    ctx.app.assignments().grade(submission_id, grade).await?;
    ctx.say(format!("Graded {} with {}", submission_id, grade));
    Ok(())
}
