use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::farmos::Record;

/// A farmOS area as stored locally. `area_id` is the remote term ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub area_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub area_type: String,
    /// WKT geometry, empty if the area has none.
    pub geom: String,
    pub synced_at: DateTime<Utc>,
}

impl Area {
    pub fn new(area_id: i64, name: impl Into<String>) -> Self {
        Self {
            area_id,
            name: name.into(),
            area_type: String::new(),
            geom: String::new(),
            synced_at: Utc::now(),
        }
    }

    pub fn with_type(mut self, area_type: impl Into<String>) -> Self {
        self.area_type = area_type.into();
        self
    }

    pub fn with_geom(mut self, geom: impl Into<String>) -> Self {
        self.geom = geom.into();
        self
    }

    /// Converts a taxonomy term record.
    ///
    /// Returns `None` if the record has no usable ID or an empty name.
    pub fn from_record(record: &Record, synced_at: DateTime<Utc>) -> Option<Self> {
        let area_id = i64::try_from(record.id()?).ok()?;
        let name = record.name().map(str::trim).filter(|n| !n.is_empty())?;

        Some(Self {
            area_id,
            name: name.to_string(),
            area_type: record.area_type().unwrap_or_default().to_string(),
            geom: record.geometry().unwrap_or_default().to_string(),
            synced_at,
        })
    }
}
