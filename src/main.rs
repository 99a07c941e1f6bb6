use clap::Parser;
use review_reminder_lib::config::{Cli, Settings};
use review_reminder_lib::error::AppError;
use review_reminder_lib::logging;
use review_reminder_lib::services::{reminder, GitLabClient, RunSummary};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(summary) => {
            log::info!(
                "Done: {} open, {} stale, {} digest(s) delivered, {} reviewer(s) without recipient",
                summary.fetched,
                summary.stale,
                summary.delivered,
                summary.skipped_recipients.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<RunSummary, AppError> {
    let settings = Settings::from_cli(cli)?;
    let directory = settings.load_recipients()?;
    let notifier = settings.notifier()?;
    let client = GitLabClient::new(settings.gitlab.clone())?;

    log::debug!(
        "Checking {} for merge requests idle over {} hours ({} timestamp, {:?} mode)",
        settings.gitlab.base_url,
        settings.run.stale_after.num_hours(),
        settings.run.timestamp_field,
        settings.run.mode
    );

    reminder::run(
        &settings.run,
        &client,
        &notifier,
        &directory,
        chrono::Utc::now(),
    )
    .await
}
