//! Single and batch purge commands

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use purger::{
    build_batch_queue, load_manifest, parse_package_args, run_batch, BatchStatus, BatchSummary,
    Credentials, DuplicatePolicy, JobOutcome, JobRequest, JobRunner, JsonFileStore,
    StagedExportSource,
};

use crate::context::{AppContext, Tone};
use crate::prompt::TerminalPrompt;

type Runner = JobRunner<JsonFileStore, StagedExportSource, StagedExportSource>;

fn runner(ctx: &AppContext, operator: String, credentials: Credentials) -> Runner {
    let source = StagedExportSource::from_config(&ctx.config);
    JobRunner::new(Arc::clone(&ctx.ledger), source.clone(), source, &ctx.config)
        .with_prompt(Arc::new(TerminalPrompt))
        .with_operator(operator)
        .with_credentials(credentials)
}

/// Configured sign-in with the `--username` flag applied; asks for the
/// password when none is configured.
fn resolve_credentials(ctx: &AppContext, username: Option<String>) -> Result<Credentials> {
    let credentials = ctx.config.credentials.clone().with_overrides(username, None);
    if credentials.has_password() || ctx.quiet {
        return Ok(credentials);
    }
    let password = ctx.password("TurnPoint password")?;
    Ok(credentials.with_overrides(None, Some(password)))
}

/// Operator name from the flag, else asked once.
fn resolve_operator(ctx: &AppContext, flag: Option<String>) -> Result<String> {
    let operator = match flag.filter(|name| !name.trim().is_empty()) {
        Some(name) => name.trim().to_string(),
        None => ctx.input("Identify yourself", &ctx.config.operator)?,
    };
    let operator = if operator.is_empty() {
        ctx.config.operator.clone()
    } else {
        operator
    };
    ctx.say(Tone::Note, &format!("Operating as {operator}"));
    Ok(operator)
}

pub struct RunArgs {
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub force_duplicate: bool,
    pub no_duplicate_prompt: bool,
    pub operator: Option<String>,
    pub username: Option<String>,
}

pub async fn run(ctx: &AppContext, args: RunArgs) -> Result<()> {
    let client_id = match args.client_id {
        Some(id) => id,
        None => ctx.input("TurnPoint client ID", "")?,
    };
    if client_id.trim().is_empty() {
        return Err(anyhow!("A client ID is required"));
    }

    let operator = resolve_operator(ctx, args.operator)?;
    let credentials = resolve_credentials(ctx, args.username)?;
    let policy = DuplicatePolicy {
        allow_duplicate: args.force_duplicate,
        prompt: !args.no_duplicate_prompt && !args.force_duplicate && !ctx.quiet,
    };

    let mut request = JobRequest::new(client_id).with_policy(policy);
    if let Some(name) = args.client_name {
        request = request.with_display_name(name);
    }

    ctx.say(Tone::Heading, &format!("Purging client {}", request.subject_key));
    match runner(ctx, operator, credentials).run(&request).await {
        JobOutcome::Completed {
            sequence_id,
            location,
        } => {
            ctx.say(Tone::Good, &format!("Purge {sequence_id} complete"));
            ctx.field("Archive", location.display());
            Ok(())
        }
        JobOutcome::Duplicate {
            subject_key,
            notice_path,
            ..
        } => {
            ctx.say(Tone::Caution, &format!("Client {subject_key} skipped as a duplicate"));
            ctx.field("Notice", notice_path.display());
            Ok(())
        }
        JobOutcome::Failed(e) => {
            Err(e).with_context(|| format!("Purge of client {} failed", request.subject_key))
        }
    }
}

pub struct BatchArgs {
    pub manifest: Option<PathBuf>,
    pub packages: Vec<String>,
    pub all_clients: bool,
    pub force_duplicate: bool,
    pub operator: Option<String>,
    pub username: Option<String>,
}

pub async fn batch(ctx: &AppContext, args: BatchArgs) -> Result<()> {
    let manifest = args
        .manifest
        .or_else(|| ctx.config.default_manifest.clone())
        .ok_or_else(|| anyhow!("Batch purging requires --manifest or PURGER_MANIFEST"))?;

    let packages = parse_package_args(&args.packages);
    let entries = load_manifest(&manifest)
        .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;
    let queue = build_batch_queue(entries, &packages, args.all_clients)?;

    ctx.say(Tone::Heading, &format!("Batch purge of {} client(s)", queue.len()));
    if !ctx.confirm("Start the batch?", true)? {
        ctx.say(Tone::Caution, "Batch cancelled");
        return Ok(());
    }

    let operator = resolve_operator(ctx, args.operator)?;
    let credentials = resolve_credentials(ctx, args.username)?;
    let results = run_batch(&runner(ctx, operator, credentials), &queue, args.force_duplicate)
        .await
        .context("Batch purge halted")?;

    for entry in &results {
        let line = match (&entry.status, &entry.location) {
            (BatchStatus::Completed, Some(location)) => {
                format!("{} {}: {}", entry.status, entry.subject_key, location.display())
            }
            _ => format!("{} {}", entry.status, entry.subject_key),
        };
        let tone = match entry.status {
            BatchStatus::Completed => Tone::Good,
            BatchStatus::Duplicate => Tone::Caution,
        };
        ctx.say(tone, &line);
    }

    let summary = BatchSummary::from_entries(&results);
    ctx.field("Completed", summary.completed);
    ctx.field("Duplicates skipped", summary.duplicates);
    Ok(())
}
