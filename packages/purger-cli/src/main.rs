//! Client purge CLI
//!
//! Runs single or batch purges against staged exports and inspects the
//! purge ledger.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;
mod context;
mod prompt;

use cmd::purge::{BatchArgs, RunArgs};
use context::AppContext;

#[derive(Parser)]
#[command(name = "purger")]
#[command(about = "Client purge runner and ledger tools")]
#[command(version)]
struct Cli {
    /// Run in quiet mode (non-interactive)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Purge one client
    Run {
        /// TurnPoint client ID (prompts when omitted)
        client_id: Option<String>,

        /// Friendly name used until the details page provides one
        #[arg(long)]
        client_name: Option<String>,

        /// Rerun even if the client was already purged
        #[arg(long)]
        force_duplicate: bool,

        /// Never ask before skipping a duplicate
        #[arg(long)]
        no_duplicate_prompt: bool,

        /// Operator recorded against the purge
        #[arg(long)]
        operator: Option<String>,

        /// Sign in as this user instead of TP_USERNAME
        #[arg(long)]
        username: Option<String>,
    },

    /// Purge clients listed in a manifest
    Batch {
        /// CSV manifest (client_id, client_name, package)
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Restrict to packages (repeat or comma-separate)
        #[arg(short, long = "package")]
        packages: Vec<String>,

        /// Purge every client in the manifest
        #[arg(long)]
        all_clients: bool,

        /// Rerun clients even if they were already purged
        #[arg(long)]
        force_duplicate: bool,

        /// Operator recorded against each purge
        #[arg(long)]
        operator: Option<String>,

        /// Sign in as this user instead of TP_USERNAME
        #[arg(long)]
        username: Option<String>,
    },

    /// Show ledger counters
    Stats,

    /// Show recent purges, newest first
    History {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Report whether a client was already purged
    Check { client_id: String },

    /// Delete the archive and reset every counter
    Reset {
        /// Skip the confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,purger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let ctx = AppContext::new(cli.quiet)?;

    match cli.command {
        Commands::Run {
            client_id,
            client_name,
            force_duplicate,
            no_duplicate_prompt,
            operator,
            username,
        } => {
            cmd::purge::run(
                &ctx,
                RunArgs {
                    client_id,
                    client_name,
                    force_duplicate,
                    no_duplicate_prompt,
                    operator,
                    username,
                },
            )
            .await
        }
        Commands::Batch {
            manifest,
            packages,
            all_clients,
            force_duplicate,
            operator,
            username,
        } => {
            cmd::purge::batch(
                &ctx,
                BatchArgs {
                    manifest,
                    packages,
                    all_clients,
                    force_duplicate,
                    operator,
                    username,
                },
            )
            .await
        }
        Commands::Stats => cmd::ledger::stats(&ctx),
        Commands::History { limit } => cmd::ledger::history(&ctx, limit),
        Commands::Check { client_id } => cmd::ledger::check(&ctx, &client_id),
        Commands::Reset { yes } => cmd::ledger::reset(&ctx, yes),
    }
}
