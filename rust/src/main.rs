//! Command-line front end for the credential store. Each invocation is one
//! session: the store file is loaded before the command runs and saved before
//! the command's outcome is reported.

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hashkeep::config::{load_config, RuntimeConfig};
use hashkeep::{CredentialStore, Session, StoreError};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Parser, Debug)]
#[command(name = "hashkeep", version, about = "Store and verify hashed service secrets")]
struct Cli {
    /// JSON config file
    #[arg(long, env = "HASHKEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Store file, overriding the config
    #[arg(long)]
    store: Option<PathBuf>,

    /// Log level, overriding the config
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hash and store a secret for a new service
    Add { service: String, secret: Option<String> },
    /// Verify a secret and print the stored hash
    Get { service: String, secret: Option<String> },
    /// Verify a secret, printing match or no-match
    Verify { service: String, secret: Option<String> },
    /// Replace the secret of an existing service
    Update { service: String, secret: Option<String> },
    /// Delete a service
    Remove { service: String },
    /// List stored service names
    List,
}

fn initialize_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Trims user input; the store matches names and secrets exactly.
fn field(value: &str, name: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{name} must not be empty");
    }
    Ok(trimmed.to_string())
}

fn secret(arg: Option<&str>) -> Result<Zeroizing<String>> {
    let raw = match arg {
        Some(value) => Zeroizing::new(value.to_string()),
        None => {
            let mut line = Zeroizing::new(String::new());
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read secret from stdin")?;
            line
        }
    };
    Ok(Zeroizing::new(field(&raw, "secret")?))
}

fn run(command: &Command, store: &CredentialStore) -> Result<()> {
    match command {
        Command::Add { service, secret: arg } => {
            let service = field(service, "service")?;
            store.add(&service, &secret(arg.as_deref())?)?;
            println!("stored credential for {service}");
        }
        Command::Get { service, secret: arg } => {
            let service = field(service, "service")?;
            let hash = store.get(&service, &secret(arg.as_deref())?)?;
            println!("{hash}");
        }
        Command::Verify { service, secret: arg } => {
            let service = field(service, "service")?;
            let matched = store.verify(&service, &secret(arg.as_deref())?)?;
            println!("{}", if matched { "match" } else { "no-match" });
            if !matched {
                return Err(StoreError::AuthenticationFailed(service).into());
            }
        }
        Command::Update { service, secret: arg } => {
            let service = field(service, "service")?;
            store.update(&service, &secret(arg.as_deref())?)?;
            println!("updated credential for {service}");
        }
        Command::Remove { service } => {
            let service = field(service, "service")?;
            store.remove(&service)?;
            println!("removed credential for {service}");
        }
        Command::List => {
            for service in store.services() {
                println!("{service}");
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if let Some(store) = cli.store.clone() {
        config.store_path = store;
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level;
    }
    initialize_tracing(&config.log_level);

    let engine = config.hash_engine()?;
    let session = Session::open(&config.store_path, engine).with_context(|| {
        format!("failed to open credential store {}", config.store_path.display())
    })?;

    execute(session, &cli.command)
}

/// Runs one command and saves the session whether or not the command failed.
fn execute(session: Session, command: &Command) -> Result<()> {
    let outcome = run(command, session.store());
    if let Err(err) = &outcome {
        match err.downcast_ref::<StoreError>() {
            Some(store_err) if store_err.is_expected() => tracing::warn!("{store_err}"),
            _ => tracing::error!("{err:#}"),
        }
    }

    session.close().context("failed to save credential store")?;
    outcome
}
