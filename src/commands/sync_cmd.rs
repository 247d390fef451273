//! Sync CLI commands for pulling records from farmOS.

use std::io::{self, Write};

use clap::{Args, Subcommand};
use sqlx::SqlitePool;

use farmsync::config::Config;
use farmsync::db::AreaRepository;
use farmsync::farmos::{AuthError, FarmOsClient, TransportError};
use farmsync::models::RecordKind;
use farmsync::sync::{OperationStatus, SyncRequest, SyncRunner};

/// Sync records from farmOS
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,

    /// Record types to sync (default: all)
    #[arg(long = "records", value_enum)]
    records: Vec<RecordKind>,

    /// Only sync areas of this type (farmOS machine name, e.g. "field")
    #[arg(long)]
    area_type: Option<String>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show farmOS configuration and check the login
    Status,
}

impl SyncCommand {
    pub async fn run(&self, pool: &SqlitePool, config: &Config) -> Result<(), SyncCommandError> {
        match &self.command {
            None => self.sync(pool, config).await,
            Some(SyncSubcommand::Status) => self.status(config).await,
        }
    }

    fn request(&self) -> SyncRequest {
        let kinds = if self.records.is_empty() {
            RecordKind::ALL.to_vec()
        } else {
            self.records.clone()
        };

        let mut request = SyncRequest::new(kinds);
        request.area_type = self.area_type.clone();
        request
    }

    async fn sync(&self, pool: &SqlitePool, config: &Config) -> Result<(), SyncCommandError> {
        let credentials = config
            .farmos
            .credentials()
            .ok_or(SyncCommandError::NotConfigured)?;
        let mut client = FarmOsClient::connect(credentials, config.farmos.timeout())?;
        let repo = AreaRepository::new(pool.clone());

        println!("Syncing from farmOS...");
        println!();

        let report = SyncRunner::new(&mut client, &repo)
            .run(&self.request())
            .await?;

        for op in &report.operations {
            match &op.status {
                OperationStatus::Succeeded => {
                    print!("  ✓ {}: {} saved", op.kind, op.stored);
                    if op.skipped > 0 {
                        print!(", {} skipped", op.skipped);
                    }
                    if op.missing_pages > 0 {
                        print!(", {} page(s) not delivered", op.missing_pages);
                    }
                    println!();
                }
                OperationStatus::Failed(reason) => {
                    println!("  ✗ {}: {}", op.kind, reason);
                }
            }
        }

        println!();
        if report.failed() == 0 {
            println!(
                "Sync complete: {} operation{} succeeded.",
                report.succeeded(),
                if report.succeeded() == 1 { "" } else { "s" }
            );
        } else {
            println!(
                "Sync finished with errors: {} succeeded, {} failed. See the log for details.",
                report.succeeded(),
                report.failed()
            );
        }

        Ok(())
    }

    async fn status(&self, config: &Config) -> Result<(), SyncCommandError> {
        println!("farmOS Configuration");
        println!("====================");
        println!();

        let Some(credentials) = config.farmos.credentials() else {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  farmos:");
            println!("    hostname: \"farm.example.com\"");
            println!("    username: \"your-user\"");
            println!("    password: \"your-password\"");
            println!();
            println!("Or set environment variables:");
            println!("  FARMSYNC_HOSTNAME");
            println!("  FARMSYNC_USERNAME");
            println!("  FARMSYNC_PASSWORD");
            println!("  FARMSYNC_TIMEOUT_SECS (optional)");
            return Ok(());
        };

        println!("Host:     {}", credentials.host());
        println!("Username: {}", credentials.username);
        println!("Timeout:  {}s", config.farmos.timeout_secs.value);
        println!();

        print!("Login: ");
        let _ = io::stdout().flush();

        let mut client = FarmOsClient::connect(credentials, config.farmos.timeout())?;
        match client.authenticate().await {
            Ok(()) => println!("✓ authenticated"),
            Err(AuthError::Transport(_)) => println!("✗ unreachable"),
            Err(e) => println!("✗ {}", e),
        }

        Ok(())
    }
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    NotConfigured,
    AuthError(AuthError),
    TransportError(TransportError),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::NotConfigured => write!(
                f,
                "farmOS not configured. Add hostname, username and password to config."
            ),
            SyncCommandError::AuthError(e) => write!(f, "{}", e),
            SyncCommandError::TransportError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::NotConfigured => None,
            SyncCommandError::AuthError(e) => Some(e),
            SyncCommandError::TransportError(e) => Some(e),
        }
    }
}

impl From<AuthError> for SyncCommandError {
    fn from(e: AuthError) -> Self {
        SyncCommandError::AuthError(e)
    }
}

impl From<TransportError> for SyncCommandError {
    fn from(e: TransportError) -> Self {
        SyncCommandError::TransportError(e)
    }
}
