//! State snapshot export/import.
//!
//! A [`GridStateSnapshot`] captures everything needed to reproduce derived
//! state on the same raw rows and columns: filter (including quick-filter
//! terms), sort, grouping, aggregation, pagination, column visibility,
//! expansion state and scroll position. Snapshots are plain JSON so host
//! applications can persist them across sessions; importing one on the same
//! inputs reproduces the identical flattened list and render context.

use crate::error::{GridError, Result, ResultExt};
use crate::model::{
    AggregationModel, ColumnVisibilityModel, FilterModel, GroupingModel, PaginationModel,
    SortModel,
};
use crate::types::RowKey;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persisted scroll offsets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrollPosition {
    pub top: f64,
    pub left: f64,
}

/// One explicit expand/collapse toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionEntry {
    pub key: RowKey,
    pub expanded: bool,
}

/// Expansion state: the default depth plus explicit per-row overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpansionSnapshot {
    pub default_depth: i32,
    pub overrides: Vec<ExpansionEntry>,
}

/// Full derived-state snapshot, JSON-round-trippable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GridStateSnapshot {
    pub filter: FilterModel,
    pub sort: SortModel,
    pub grouping: GroupingModel,
    pub aggregation: AggregationModel,
    pub pagination: Option<PaginationModel>,
    pub column_visibility: ColumnVisibilityModel,
    pub expansion: ExpansionSnapshot,
    pub scroll: ScrollPosition,
}

impl GridStateSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(GridError::from)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(GridError::from)
    }

    /// Save as JSON to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json)
            .map_err(GridError::from)
            .with_context(|| format!("Failed to save snapshot to {}", path.as_ref().display()))
    }

    /// Load a snapshot previously written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(GridError::from)
            .with_context(|| format!("Failed to load snapshot from {}", path.as_ref().display()))?;
        Self::from_json(&json)
    }
}
