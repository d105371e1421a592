//! Usage command - fetch and display current usage.

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use claudemeter_store::SettingsRepository;
use tracing::info;

use super::AppContext;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the usage command.
#[derive(Args, Default)]
pub struct UsageArgs {
    /// Bypass the cached snapshot.
    #[arg(long)]
    pub force: bool,

    /// Show the Sonnet window even if disabled in settings.
    #[arg(long)]
    pub sonnet: bool,
}

/// Runs the usage command.
pub async fn run(args: &UsageArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::new(cli)?;
    let settings = ctx.settings.load_settings().await?;
    let show_sonnet = args.sonnet || settings.show_sonnet_usage;

    info!(force = args.force, "Fetching usage");
    let result = ctx.coordinator.fetch(args.force).await;
    let now = Utc::now();

    match cli.format {
        OutputFormat::Text => {
            // Errors are reported by the caller.
            if let Ok(snapshot) = &result {
                let formatter = TextFormatter::new(!cli.no_color);
                println!("{}", formatter.format_snapshot(snapshot, show_sonnet, now));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let output = match &result {
                Ok(snapshot) => formatter.format_snapshot(snapshot, show_sonnet, now)?,
                Err(e) => formatter.format_error(&e.to_string())?,
            };
            println!("{output}");
        }
    }

    result.map(|_| ())?;
    Ok(())
}
