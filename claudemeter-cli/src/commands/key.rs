//! Key command - store and check the claude.ai session key.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use claudemeter_core::SessionKey;
use claudemeter_fetch::{ClaudeWebClient, FetchError, SessionKeyValidator, ValidationError};
use claudemeter_store::{CredentialStore, DEFAULT_ACCOUNT, SettingsRepository, SystemKeychain};
use std::io::{BufRead, IsTerminal};
use std::sync::Arc;
use tracing::info;

use super::settings_repository;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the key command.
#[derive(Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub action: KeyAction,
}

/// Key subcommands.
#[derive(Subcommand)]
pub enum KeyAction {
    /// Validate a session key and store it in the keychain.
    Set {
        /// Session key (sk-ant-...). Read from stdin when omitted.
        key: Option<String>,
    },

    /// Check the stored session key against claude.ai.
    Check,
}

/// Runs the key command.
pub async fn run(args: &KeyArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        KeyAction::Set { key } => set_key(key.as_deref(), cli).await,
        KeyAction::Check => check_key(cli).await,
    }
}

fn validator() -> Result<SessionKeyValidator> {
    let api = ClaudeWebClient::new().context("Failed to create HTTP client")?;
    Ok(SessionKeyValidator::new(Arc::new(api)))
}

async fn set_key(key: Option<&str>, cli: &Cli) -> Result<()> {
    let raw = match key {
        Some(key) => key.to_string(),
        None => read_key_from_stdin()?,
    };

    // Nothing is stored unless both stages pass.
    let key = validator()?.validate(&raw).await?;

    SystemKeychain::default()
        .save(DEFAULT_ACCOUNT, key.as_str())
        .await
        .context("Failed to store session key")?;

    // A new key may belong to a different organization.
    let repository = settings_repository(cli);
    let mut settings = repository.load_settings().await?;
    settings.is_first_launch = false;
    settings.cached_organization_id = None;
    repository.save_settings(&settings).await?;

    info!("Session key stored");
    if !cli.quiet {
        match cli.format {
            OutputFormat::Text => println!("Session key saved"),
            OutputFormat::Json => {
                let output = serde_json::json!({ "saved": true });
                println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
            }
        }
    }

    Ok(())
}

fn read_key_from_stdin() -> Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("Paste session key: ");
    }
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("Failed to read session key from stdin")?;
    Ok(line.trim().to_string())
}

async fn check_key(cli: &Cli) -> Result<()> {
    let stored = SystemKeychain::default()
        .retrieve(DEFAULT_ACCOUNT)
        .await
        .context("Failed to read session key")?
        .ok_or(FetchError::MissingCredential)?;

    let key = SessionKey::parse(&stored).map_err(ValidationError::InvalidFormat)?;
    let has_organization = validator()?.validate_remote(&key).await?;

    if cli.quiet {
        return Ok(());
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            if has_organization {
                println!("{}", formatter.bold("Session key is valid"));
            } else {
                println!("Session key is valid but has no organization");
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "hasOrganization": has_organization,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}
