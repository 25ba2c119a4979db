//! Model objects driving the pipeline.
//!
//! Filter, sort, grouping, aggregation, pagination and column-visibility
//! models are plain serde-serializable data: the engine's inputs are
//! JSON-round-trippable so host applications can persist and restore them
//! verbatim (see the snapshot module).

use crate::column::FilterOperator;
use crate::error::{GridError, Result};
use crate::types::CellValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How filter clauses combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogicOperator {
    #[default]
    And,
    Or,
}

/// One filter clause: column + operator + comparison value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterClause {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: CellValue,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: CellValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Structured filter clauses plus quick-filter search terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterModel {
    pub clauses: Vec<FilterClause>,
    pub operator: LogicOperator,
    /// Free-text terms matched case-insensitively against every visible
    /// column's formatted value; terms combine with AND.
    pub quick_filter: Vec<String>,
}

impl FilterModel {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty() && self.quick_filter.iter().all(|t| t.trim().is_empty())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// One entry in the comparator chain; the first entry is the primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortItem {
    pub field: String,
    pub direction: SortDirection,
}

impl SortItem {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Ordered multi-column sort model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SortModel {
    pub items: Vec<SortItem>,
}

impl SortModel {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ordered list of fields to group by; empty means a flat tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupingModel {
    pub fields: Vec<String>,
}

impl GroupingModel {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A field listed twice would re-bucket its own buckets; that is
    /// malformed input, fatal to the pipeline run.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.as_str()) {
                return Err(GridError::DuplicateGroupingField(field.clone()));
            }
        }
        Ok(())
    }
}

/// Field → aggregation function name. Only applies while grouping is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregationModel {
    pub fields: BTreeMap<String, String>,
}

impl AggregationModel {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn set(&mut self, field: impl Into<String>, function: impl Into<String>) {
        self.fields.insert(field.into(), function.into());
    }
}

/// Page window applied to the flattened list before virtualization.
/// A `page_size` of zero disables pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationModel {
    pub page: usize,
    pub page_size: usize,
}

impl PaginationModel {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    pub fn is_enabled(&self) -> bool {
        self.page_size > 0
    }
}

/// Field → shown flag; absent fields are visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ColumnVisibilityModel {
    pub fields: BTreeMap<String, bool>,
}

impl ColumnVisibilityModel {
    pub fn is_visible(&self, field: &str) -> bool {
        self.fields.get(field).copied().unwrap_or(true)
    }

    pub fn hide(&mut self, field: impl Into<String>) {
        self.fields.insert(field.into(), false);
    }

    pub fn show(&mut self, field: impl Into<String>) {
        self.fields.insert(field.into(), true);
    }
}

/// All model objects the pipeline consumes, bundled for the run context.
#[derive(Debug, Clone, Default)]
pub struct GridModels {
    pub filter: FilterModel,
    pub sort: SortModel,
    pub grouping: GroupingModel,
    pub aggregation: AggregationModel,
    pub pagination: Option<PaginationModel>,
    pub visibility: ColumnVisibilityModel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_model_empty() {
        assert!(FilterModel::default().is_empty());
        let with_blank_quick = FilterModel {
            quick_filter: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(with_blank_quick.is_empty());
    }

    #[test]
    fn test_grouping_validate_rejects_duplicates() {
        let model = GroupingModel {
            fields: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(matches!(
            model.validate(),
            Err(GridError::DuplicateGroupingField(f)) if f == "a"
        ));
    }

    #[test]
    fn test_sort_direction_reversed() {
        assert_eq!(SortDirection::Asc.reversed(), SortDirection::Desc);
    }

    #[test]
    fn test_pagination_disabled_at_zero() {
        assert!(!PaginationModel::new(0, 0).is_enabled());
        assert!(PaginationModel::new(0, 25).is_enabled());
    }

    #[test]
    fn test_visibility_defaults_to_visible() {
        let mut model = ColumnVisibilityModel::default();
        assert!(model.is_visible("anything"));
        model.hide("secret");
        assert!(!model.is_visible("secret"));
        model.show("secret");
        assert!(model.is_visible("secret"));
    }

    #[test]
    fn test_filter_model_json_round_trip() {
        let model = FilterModel {
            clauses: vec![FilterClause::new(
                "age",
                FilterOperator::GreaterThan,
                CellValue::Number(21.0),
            )],
            operator: LogicOperator::Or,
            quick_filter: vec!["smith".into()],
        };
        let json = serde_json::to_string(&model).unwrap();
        let back: FilterModel = serde_json::from_str(&json).unwrap();
        assert_eq!(model, back);
    }
}
