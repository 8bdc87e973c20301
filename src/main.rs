use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use issuecast::cli::{Cli, CliCommand};
use issuecast::config::Config;
use issuecast::error::Result;
use issuecast::logging::init_logging;
use issuecast::message::MessageRenderer;
use issuecast::messenger::telegram::TelegramMessenger;
use issuecast::notifier::Notifier;
use issuecast::orchestrator::Orchestrator;
use issuecast::pacing::Pacer;
use issuecast::sources::redmine;
use issuecast::sources::{IssueTracker, StatusFilter};
use issuecast::state::{FileWatermarkStore, WatermarkStore};

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: failed to open log file {}: {e}", config.log_file);
            std::process::exit(1);
        }
    };

    info!(?config, "config loaded");

    let result = match cli.command {
        None => run_cycle(&config),
        Some(CliCommand::Statuses) => list_statuses(&config),
        Some(CliCommand::Watermark) => show_watermark(&config),
    };

    if let Err(e) = result {
        error!(error = %e, "issuecast failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_cycle(config: &Config) -> Result<()> {
    let source = redmine::from_config(config)?;
    let messenger = TelegramMessenger::from_config(config)?;
    let store = FileWatermarkStore::new(&config.state_dir);
    let renderer = MessageRenderer::new(&config.message_template, &config.status_line)?;
    let pacer = Pacer::new(Duration::from_millis(config.send_interval_ms));

    let notifier = Notifier::new(messenger, store, renderer, pacer, config.channel.clone());
    let orchestrator = Orchestrator::new(source, notifier);

    orchestrator.run_once(StatusFilter(config.status))?;
    Ok(())
}

fn list_statuses(config: &Config) -> Result<()> {
    let source = redmine::from_config(config)?;
    for status in source.fetch_statuses()? {
        let closed = if status.is_closed { " (closed)" } else { "" };
        println!("{}\t{}{}", status.id, status.name, closed);
    }
    Ok(())
}

fn show_watermark(config: &Config) -> Result<()> {
    let status = StatusFilter(config.status);
    let store = FileWatermarkStore::new(&config.state_dir);
    let key = status.watermark_key();
    let value = store.get(&key)?.unwrap_or(0);
    println!("{key}\t{value}");
    Ok(())
}
