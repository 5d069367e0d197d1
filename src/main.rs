mod commands;
mod dates;
mod notifier;
mod render;
mod session;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use execsync_core::AppointmentKind;
use execsync_core::calendar::Month;

use crate::session::Session;

#[derive(Parser)]
#[command(name = "execsync")]
#[command(about = "Shared appointment calendar for the executive office")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a month with busy days highlighted
    Calendar {
        /// Month to show (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<Month>,
    },
    /// List the appointments of one day
    Day {
        /// Date (YYYY-MM-DD or e.g. "next friday", defaults to today)
        date: Option<String>,
    },
    /// List the days of a month without appointments
    Free {
        /// Month to check (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<Month>,
    },
    /// Add an appointment (prompts for anything missing)
    Add {
        #[arg(short, long)]
        title: Option<String>,

        /// Date (YYYY-MM-DD or e.g. "tomorrow")
        #[arg(short, long)]
        date: Option<String>,

        /// Start time (HH:MM)
        #[arg(long)]
        time: Option<String>,

        /// work or personal
        #[arg(long = "type")]
        kind: Option<AppointmentKind>,

        #[arg(short, long)]
        note: Option<String>,

        #[arg(long)]
        dress_code: Option<String>,
    },
    /// Delete an appointment by id
    Remove {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Stay subscribed and alert on new appointments until Ctrl-C
    Watch,
    /// Show config and data paths and the effective settings
    Config,
    /// Interactive calendar (the default)
    Ui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Commands::Ui) {
        Commands::Calendar { month } => commands::calendar::run(Session::start().await?, month).await,
        Commands::Day { date } => commands::day::run(Session::start().await?, date).await,
        Commands::Free { month } => commands::free::run(Session::start().await?, month).await,
        Commands::Add {
            title,
            date,
            time,
            kind,
            note,
            dress_code,
        } => {
            let args = commands::add::AddArgs {
                title,
                date,
                time,
                kind,
                note,
                dress_code,
            };
            commands::add::run(Session::start().await?, args).await
        }
        Commands::Remove { id, yes } => commands::remove::run(Session::start().await?, &id, yes).await,
        Commands::Watch => commands::watch::run(Session::start().await?).await,
        Commands::Config => commands::config::run(),
        Commands::Ui => commands::ui::run(Session::start().await?).await,
    }
}

/// Logs go to stderr so they never mix with rendered output.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
