use serde::{Deserialize, Serialize};
use std::fmt;

/// A type of farmOS record that can be synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Areas,
}

impl RecordKind {
    pub const ALL: [RecordKind; 1] = [RecordKind::Areas];
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Areas => write!(f, "areas"),
        }
    }
}
