use clap::{Args, Subcommand};

use super::OutputFormat;
use farmsync::config::{Config, ConfigSource};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        let farmos = &config.farmos;
                        print_setting(
                            "farmos.hostname",
                            farmos.hostname.value.as_deref(),
                            farmos.hostname.source,
                        );
                        print_setting(
                            "farmos.username",
                            farmos.username.value.as_deref(),
                            farmos.username.source,
                        );
                        print_setting(
                            "farmos.password",
                            farmos.password.value.as_ref().map(|_| "****"),
                            farmos.password.source,
                        );
                        println!("farmos.timeout_secs: {}", farmos.timeout_secs.value);
                        println!("  source: {}", farmos.timeout_secs.source);
                    }
                }
                Ok(())
            }
        }
    }
}

fn print_setting(key: &str, value: Option<&str>, source: ConfigSource) {
    println!("{}: {}", key, value.unwrap_or("(not set)"));
    println!("  source: {}", source);
}
