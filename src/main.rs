use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{AreasCommand, ConfigCommand, SyncCommand};
use farmsync::config::Config;
use farmsync::db::{init_db, AreaRepository};

#[derive(Parser)]
#[command(name = "farmsync")]
#[command(version)]
#[command(about = "Sync farmOS areas into a local database", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log farmOS requests to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync records from farmOS
    Sync(SyncCommand),

    /// Browse synced areas
    Areas(AreasCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Sync(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            cmd.run(&pool, &config).await?;
        }
        Some(Commands::Areas(cmd)) => {
            let pool = init_db(&config.database_path.value).await?;
            let repo = AreaRepository::new(pool);
            cmd.run(&repo).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "farmsync=debug"
    } else {
        "farmsync=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
