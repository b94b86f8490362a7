//! qit - CLI entry point.

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input};
use tracing_subscriber::EnvFilter;

use qit::commit::{CommitPlan, commit};
use qit::compose::compose;
use qit::config::Config;
use qit::error::CommitError;
use qit::process::{CancelToken, GitProcess, ProcessGateway, check_git_installed, run_checked};
use qit::scan::Scanner;
use qit::select::ui::{DialoguerPrompt, run_selection};

/// Interactive git commits with automatic change classification.
#[derive(Parser, Debug)]
#[command(name = "qit")]
#[command(about = "Interactive git commits with automatic change classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the commit history
    Log {
        /// One line per commit, most recent ten only
        #[arg(long)]
        short: bool,
    },
    /// Push the current branch to its upstream
    Push {
        /// Push even when the working tree has pending changes
        #[arg(long)]
        force: bool,
    },
    /// Undo the last commit, keeping its changes staged
    Undo,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            // An unreadable commit outcome needs a by-hand look, so it
            // gets its own exit code.
            match err.downcast_ref::<CommitError>() {
                Some(CommitError::AmbiguousOutcome { .. }) => ExitCode::from(3),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    check_git_installed()
        .await
        .context("git is required to run qit")?;

    let config = Config::from_env();
    let cancel = CancelToken::new();
    let gateway = GitProcess::new(".", config.git_timeout).with_cancel(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match cli.command {
        Some(Command::Log { short }) => run_log(&gateway, short).await,
        Some(Command::Push { force }) => run_push(&gateway, force).await,
        Some(Command::Undo) => run_undo(&gateway).await,
        None => run_review(&gateway, &config).await,
    }
}

/// The default flow: scan, classify, select, compose, commit.
async fn run_review(gateway: &GitProcess, config: &Config) -> Result<()> {
    let changes = Scanner::new(gateway)
        .scan()
        .await
        .context("Failed to scan the working tree")?;

    if changes.is_empty() {
        println!("Nothing to commit, working tree clean.");
        return Ok(());
    }

    let classifications = qit::classify::classify(&changes);

    let mut prompt = DialoguerPrompt::default();
    let Some(selected) = run_selection(changes, &mut prompt)? else {
        println!("Cancelled, no commit made.");
        return Ok(());
    };

    let summary: String = Input::new()
        .with_prompt("Commit summary")
        .interact_text()
        .context("Failed to read commit summary")?;
    let body: String = Input::new()
        .with_prompt("Body (optional)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read commit body")?;
    let body = (!body.trim().is_empty()).then_some(body.as_str());

    let message = compose(&selected, &classifications, &summary, body, config)
        .context("Failed to compose the commit message")?;

    let accepted = Confirm::new()
        .with_prompt(format!("Commit as \"{}\"?", message.format().lines().next().unwrap_or("")))
        .default(true)
        .interact()
        .context("Failed to read confirmation")?;
    if !accepted {
        println!("Cancelled, no commit made.");
        return Ok(());
    }

    // Last point where cancellation is honored. The commit sequence runs
    // on a detached handle so a mid-sequence ctrl-c cannot starve the
    // staging or rollback commands and leave the index half-staged.
    if gateway.is_cancelled() {
        println!("Cancelled, no commit made.");
        return Ok(());
    }

    let plan = CommitPlan::new(selected, message)?;
    let result = commit(&gateway.detached(), &plan).await?;

    println!("✓ Committed {}", &result.hash[..result.hash.len().min(12)]);
    Ok(())
}

async fn run_log(gateway: &dyn ProcessGateway, short: bool) -> Result<()> {
    let args: &[&str] = if short {
        &["log", "--oneline", "-10"]
    } else {
        &["log"]
    };

    let code = gateway.run_interactive(args).await?;
    if code != 0 {
        bail!("git log exited with code {code}");
    }
    Ok(())
}

async fn run_push(gateway: &dyn ProcessGateway, force: bool) -> Result<()> {
    if !force {
        let status = run_checked(gateway, &["status", "--porcelain"]).await?;
        if !status.stdout.trim().is_empty() {
            bail!(
                "The working tree has pending changes. Commit them first or \
                 push anyway with --force"
            );
        }
    }

    let args: &[&str] = if force { &["push", "--force"] } else { &["push"] };
    let code = gateway.run_interactive(args).await?;
    if code != 0 {
        bail!("git push exited with code {code}");
    }
    println!("✓ Pushed");
    Ok(())
}

async fn run_undo(gateway: &dyn ProcessGateway) -> Result<()> {
    run_checked(gateway, &["reset", "--soft", "HEAD~1"])
        .await
        .context("Failed to undo the last commit")?;
    println!("✓ Undid the last commit; its changes are kept staged.");
    Ok(())
}
