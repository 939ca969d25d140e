// Tutorly CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Role-gated commands mount the same route guards as the web
// client; a redirect ends the process with exit code 3 (/forbidden) or 2 (/login).
// Design Decision: Logs go to stderr so command output stays scriptable.

mod commands;
mod navigator;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tutorly_client::{ClientConfig, TutorlyApp};

use crate::navigator::CliNavigator;

#[derive(Parser)]
#[command(name = "tutorly")]
#[command(about = "Tutorly CLI - Browse classes, learn, teach and administer the marketplace")]
#[command(version)]
pub struct Cli {
    /// API base URL
    #[arg(long, env = "TUTORLY_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Token service base URL (defaults to the API URL)
    #[arg(long, env = "TUTORLY_AUTH_URL")]
    pub auth_url: Option<String>,

    /// Where to keep the signed-in session
    #[arg(long, env = "TUTORLY_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, register and manage your profile
    Auth {
        #[command(subcommand)]
        command: commands::auth::AuthCommand,
    },

    /// Browse approved classes
    Classes {
        #[command(subcommand)]
        command: commands::classes::ClassesCommand,
    },

    /// Student dashboard
    Student {
        #[command(subcommand)]
        command: commands::student::StudentCommand,
    },

    /// Teacher dashboard
    Teacher {
        #[command(subcommand)]
        command: commands::teacher::TeacherCommand,
    },

    /// Admin dashboard
    Admin {
        #[command(subcommand)]
        command: commands::admin::AdminCommand,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutorly=warn,tutorly_client=warn,tutorly_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let navigator = Arc::new(CliNavigator::new());

    match run(cli, navigator.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match navigator.last().filter(|_| redirected(&e)) {
            Some(redirect) => {
                eprintln!("{}", navigator::explain(&redirect));
                navigator::exit_code(redirect.to)
            }
            None => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli, navigator: Arc<CliNavigator>) -> anyhow::Result<()> {
    let config = client_config(&cli);
    let app = TutorlyApp::new(&config, navigator)?;
    app.start().await;

    let output = output::OutputFormat::from_str(&cli.output);
    let ctx = commands::Context {
        app: &app,
        output,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Auth { command } => commands::auth::run(command, &ctx).await,
        Commands::Classes { command } => commands::classes::run(command, &ctx).await,
        Commands::Student { command } => commands::student::run(command, &ctx).await,
        Commands::Teacher { command } => commands::teacher::run(command, &ctx).await,
        Commands::Admin { command } => commands::admin::run(command, &ctx).await,
    }
}

/// Whether the failure is the one the last redirect was issued for
///
/// Guard denials surface as plain errors from the command; request-client
/// redirects carry a redirected `tutorly_core::Error`.
fn redirected(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<tutorly_core::Error>() {
        Some(error) => error.redirected(),
        None => error.downcast_ref::<commands::Denied>().is_some(),
    }
}

fn client_config(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::from_env().with_api_url(&cli.api_url);
    if let Some(auth_url) = &cli.auth_url {
        config = config.with_auth_url(auth_url);
    }
    match cli.session_file.clone().or_else(default_session_file) {
        Some(path) => config.with_session_file(path),
        None => config,
    }
}

/// `$HOME/.tutorly/session.json`
fn default_session_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".tutorly").join("session.json"))
}
