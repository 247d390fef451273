//! Sync requests and the operations they expand into.

use crate::farmos::{Filters, TERM_ENTITY};
use crate::models::RecordKind;

/// What the user asked to sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRequest {
    pub kinds: Vec<RecordKind>,
    /// Only sync areas of this type (farmOS machine name).
    pub area_type: Option<String>,
}

impl SyncRequest {
    pub fn new(kinds: Vec<RecordKind>) -> Self {
        Self {
            kinds,
            area_type: None,
        }
    }

    pub fn with_area_type(mut self, area_type: impl Into<String>) -> Self {
        self.area_type = Some(area_type.into());
        self
    }

    /// One operation per selected kind, duplicates removed, in request order.
    pub fn operations(&self) -> Vec<SyncOperation> {
        let mut seen = Vec::new();
        let mut operations = Vec::new();

        for kind in &self.kinds {
            if seen.contains(kind) {
                continue;
            }
            seen.push(*kind);
            operations.push(SyncOperation::for_kind(*kind, self));
        }

        operations
    }
}

/// A single unit of sync work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOperation {
    pub kind: RecordKind,
    pub entity_type: &'static str,
    pub filters: Filters,
}

impl SyncOperation {
    fn for_kind(kind: RecordKind, request: &SyncRequest) -> Self {
        match kind {
            RecordKind::Areas => {
                let mut filters = Filters::new();
                if let Some(area_type) = request
                    .area_type
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                {
                    filters.insert("area_type".to_string(), area_type.to_string());
                }
                Self {
                    kind,
                    entity_type: TERM_ENTITY,
                    filters,
                }
            }
        }
    }
}
