use crate::backup::Backup;
use crate::google::{CredentialStore, GoogleClient, parse_redirect_url};
use crate::logger;
use crate::rclone::Rclone;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(
    name = "drive-backup",
    version,
    about = "Back up local directories to Google Drive with rclone",
    after_help = r#"EXAMPLES:
    drive-backup auth                                     Authorize and save token.json
    drive-backup check-auth                               Show the authorized account
    drive-backup backup --targets ~/docs:Backups/docs     Back up once, stop on first error
    drive-backup schedule --interval 3600                 Back up every hour, never stop

BACKUP_TARGETS and the other options may also be set in a .env file."#
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding credentials.json and token.json
    #[arg(long, env = "CREDENTIALS_DIR", default_value = "credentials", global = true)]
    credentials_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Authorize with Google Drive
    Auth,

    /// Check existing authentication
    CheckAuth,

    /// Run backup tasks once
    Backup(BackupArgs),

    /// Run backup tasks repeatedly
    Schedule {
        /// Interval (seconds) between backups
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        #[command(flatten)]
        backup: BackupArgs,
    },
}

#[derive(clap::Args)]
struct BackupArgs {
    /// Comma-separated SOURCE:DEST pairs
    #[arg(long, env = "BACKUP_TARGETS", default_value = "", hide_default_value = true)]
    targets: String,

    /// rclone executable
    #[arg(long, env = "RCLONE_BIN", default_value = "rclone")]
    rclone: String,
}

pub fn run() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let args = Cli::parse();
    logger::init(&args.log_level);
    if let Err(e) = dotenv {
        debug!(error = %e, ".env file can't be read");
    }

    let store = CredentialStore::new(&args.credentials_dir);
    match args.command {
        Command::Auth => auth(&store),
        Command::CheckAuth => check_auth(&store),
        Command::Backup(backup) => run_backup(&store, &backup, true),
        Command::Schedule { interval, backup } => schedule(&store, &backup, interval),
    }
}

fn auth(store: &CredentialStore) -> Result<()> {
    let creds = store.load_credentials()?;
    let url = creds.auth_url()?;
    println!("Go to the following link in your browser then paste the redirect URL:\n{url}");

    let mut redirect = String::new();
    std::io::stdin()
        .read_line(&mut redirect)
        .context("unable to read redirect URL")?;
    let code = parse_redirect_url(&redirect)?;

    let token = GoogleClient::new(creds)?.exchange_code(&code)?;
    let path = store.save_token(&token)?;
    info!(path = %path.display(), "Token saved");
    Ok(())
}

fn check_auth(store: &CredentialStore) -> Result<()> {
    let client = GoogleClient::new(store.load_credentials()?)?;
    let mut token = store.load_token()?;
    if token.is_expired(Utc::now()) {
        debug!("Access token expired, refreshing");
        token = client.refresh(&token)?;
    }

    let user = client
        .about_user(&token)
        .context("unable to retrieve about info")?;
    println!("Logged in as {} ({})", user.display_name, user.email_address);
    Ok(())
}

fn run_backup(store: &CredentialStore, args: &BackupArgs, stop_on_error: bool) -> Result<()> {
    let creds = store.load_credentials()?;
    let token = store.load_token_json()?;
    let tool = Rclone::locate(&args.rclone)?;

    let backup = Backup::new(&args.targets, &creds, &token, tool)
        .context("unable to create backup instance")?;

    debug!(config = %backup.config_path().display(), "Using rclone config");
    info!(targets = backup.items().len(), "Backup started");
    backup.run(stop_on_error).context("backup failed")?;
    info!("Backup completed successfully");
    Ok(())
}

fn schedule(store: &CredentialStore, args: &BackupArgs, interval: u64) -> Result<()> {
    info!(interval, "Scheduled backups every {interval}s");
    loop {
        if let Err(e) = run_backup(store, args, false) {
            let cause = format!("{e:#}");
            error!(error = %cause, "Backup failed");
        }
        std::thread::sleep(Duration::from_secs(interval));
    }
}
