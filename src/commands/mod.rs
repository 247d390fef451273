mod areas;
mod config_cmd;
mod sync_cmd;

pub use areas::AreasCommand;
pub use config_cmd::ConfigCommand;
pub use sync_cmd::SyncCommand;

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
