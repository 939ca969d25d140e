// Public class catalogue

use anyhow::{bail, Result};
use clap::Subcommand;

use tutorly_core::models::{ClassRecord, ClassStatus};
use tutorly_core::ClassQuery;

use super::Context;
use crate::output::{price, print_field, print_table_header, print_table_row};

#[derive(Subcommand)]
pub enum ClassesCommand {
    /// List approved classes
    List {
        /// Match title or teacher name
        #[arg(long, short)]
        search: Option<String>,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: usize,

        /// Rows per page
        #[arg(long, default_value = "10")]
        per_page: usize,
    },

    /// Show one class
    Show {
        /// Class ID
        class_id: String,
    },
}

pub async fn run(command: ClassesCommand, ctx: &Context<'_>) -> Result<()> {
    match command {
        ClassesCommand::List {
            search,
            page,
            per_page,
        } => list(ctx, search, page, per_page).await,
        ClassesCommand::Show { class_id } => show(ctx, &class_id).await,
    }
}

async fn list(ctx: &Context<'_>, search: Option<String>, page: usize, per_page: usize) -> Result<()> {
    let mut query = ClassQuery::new().status(ClassStatus::Approved);
    if let Some(search) = search {
        query = query.search(search);
    }

    let page = ctx.app.classes().search(&query, page, Some(per_page)).await?;

    if !ctx.output.is_text() {
        return ctx.output.print_value(&page);
    }

    if page.items.is_empty() {
        println!("No classes found");
        return Ok(());
    }
    print_class_table(&page.items);
    if !ctx.quiet {
        println!();
        println!(
            "Page {} of {} ({} classes)",
            page.page, page.total_pages, page.total
        );
    }
    Ok(())
}

async fn show(ctx: &Context<'_>, class_id: &str) -> Result<()> {
    let Some(class) = ctx.app.classes().get(class_id).await? else {
        bail!("Class not found: {}", class_id);
    };

    if ctx.output.is_text() {
        print_field("ID", &class.id);
        print_field("Title", &class.title);
        print_field("Teacher", &format!("{} <{}>", class.teacher_name, class.teacher_email));
        print_field("Price", &price(class.price));
        print_field("Status", class.status.as_str());
        print_field("Enrolled", &class.total_enrollment.to_string());
        if !class.description.is_empty() {
            print_field("Description", &class.description);
        }
    } else {
        ctx.output.print_value(&class)?;
    }
    Ok(())
}

pub fn print_class_table(classes: &[ClassRecord]) {
    print_table_header(&[
        ("ID", 24),
        ("TITLE", 30),
        ("TEACHER", 20),
        ("PRICE", 9),
        ("STATUS", 8),
        ("ENROLLED", 8),
    ]);
    for class in classes {
        print_table_row(&[
            (&class.id, 24),
            (&class.title, 30),
            (&class.teacher_name, 20),
            (&price(class.price), 9),
            (class.status.as_str(), 8),
            (&class.total_enrollment.to_string(), 8),
        ]);
    }
}
