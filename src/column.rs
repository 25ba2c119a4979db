//! Column schema and per-type capability records.
//!
//! Behavior that varies by column type (available filter operators, default
//! comparison, default aggregations) is carried as data in a static
//! capability record per type, looked up through [`ColumnType::caps`] —
//! a closed mapping from type tag to behavior bundle, not inheritance.
//!
//! User extension points on a column (value getter, formatter, comparator)
//! are fallible: a hook returning `None` selects a sentinel (`Null` cell,
//! `Equal` ordering, default formatting) and warns once, so one bad cell
//! never takes down a pipeline run.

use crate::diag::WarnOnce;
use crate::error::{GridError, Result};
use crate::types::{CellValue, RowRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Closed set of column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Date,
}

/// Filter operators. Which subset applies is declared per column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Contains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Is,
    After,
    OnOrAfter,
    Before,
    OnOrBefore,
    IsEmpty,
    IsNotEmpty,
}

impl FilterOperator {
    /// Operators that evaluate without a comparison value.
    pub fn is_unary(self) -> bool {
        matches!(self, FilterOperator::IsEmpty | FilterOperator::IsNotEmpty)
    }
}

/// String comparison policy for sorting and equality filters.
///
/// The default folds case through Unicode lowercasing; callers needing full
/// ICU collation supply a custom comparator on the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Collation {
    CaseSensitive,
    #[default]
    CaseInsensitive,
}

/// Behavior bundle for one column type.
pub struct ColumnTypeCaps {
    pub operators: &'static [FilterOperator],
    pub aggregations: &'static [&'static str],
}

static STRING_CAPS: ColumnTypeCaps = ColumnTypeCaps {
    operators: &[
        FilterOperator::Contains,
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::IsEmpty,
        FilterOperator::IsNotEmpty,
    ],
    aggregations: &["min", "max", "size"],
};

static NUMBER_CAPS: ColumnTypeCaps = ColumnTypeCaps {
    operators: &[
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::GreaterThan,
        FilterOperator::GreaterThanOrEqual,
        FilterOperator::LessThan,
        FilterOperator::LessThanOrEqual,
        FilterOperator::IsEmpty,
        FilterOperator::IsNotEmpty,
    ],
    aggregations: &["sum", "avg", "min", "max", "size"],
};

static BOOLEAN_CAPS: ColumnTypeCaps = ColumnTypeCaps {
    operators: &[FilterOperator::Is],
    aggregations: &["size"],
};

static DATE_CAPS: ColumnTypeCaps = ColumnTypeCaps {
    operators: &[
        FilterOperator::Is,
        FilterOperator::After,
        FilterOperator::OnOrAfter,
        FilterOperator::Before,
        FilterOperator::OnOrBefore,
        FilterOperator::IsEmpty,
        FilterOperator::IsNotEmpty,
    ],
    aggregations: &["min", "max", "size"],
};

impl ColumnType {
    pub fn caps(self) -> &'static ColumnTypeCaps {
        match self {
            ColumnType::String => &STRING_CAPS,
            ColumnType::Number => &NUMBER_CAPS,
            ColumnType::Boolean => &BOOLEAN_CAPS,
            ColumnType::Date => &DATE_CAPS,
        }
    }
}

/// Built-in aggregation function names.
pub const BUILTIN_AGGREGATIONS: &[&str] = &["sum", "avg", "min", "max", "size"];

/// Default value ordering: nulls first, same-variant values by natural
/// order, mixed variants by display string.
pub(crate) fn default_compare(collation: Collation, a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Null, CellValue::Null) => Ordering::Equal,
        (CellValue::Null, _) => Ordering::Less,
        (_, CellValue::Null) => Ordering::Greater,
        (CellValue::Number(x), CellValue::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (CellValue::Bool(x), CellValue::Bool(y)) => x.cmp(y),
        (CellValue::DateTime(x), CellValue::DateTime(y)) => x.cmp(y),
        (CellValue::Text(x), CellValue::Text(y)) => match collation {
            Collation::CaseInsensitive => x
                .to_lowercase()
                .cmp(&y.to_lowercase())
                .then_with(|| x.cmp(y)),
            Collation::CaseSensitive => x.cmp(y),
        },
        // Mixed variants fall back to display comparison
        _ => a.display().cmp(&b.display()),
    }
}

pub type ValueGetter = Arc<dyn Fn(&RowRecord) -> Option<CellValue> + Send + Sync>;
pub type ValueFormatter = Arc<dyn Fn(&CellValue) -> Option<String> + Send + Sync>;
pub type CellComparator = Arc<dyn Fn(&CellValue, &CellValue) -> Option<Ordering> + Send + Sync>;

/// Static schema for one field.
#[derive(Clone)]
pub struct ColumnDefinition {
    pub field: String,
    pub column_type: ColumnType,
    /// Pixel width used by the column virtualizer.
    pub width: f64,
    pub collation: Collation,
    /// Overrides the type's default operator set when present.
    pub operators: Option<Vec<FilterOperator>>,
    /// Overrides the type's default available aggregations when present.
    pub aggregations: Option<Vec<String>>,
    pub value_getter: Option<ValueGetter>,
    pub value_formatter: Option<ValueFormatter>,
    pub comparator: Option<CellComparator>,
}

impl fmt::Debug for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDefinition")
            .field("field", &self.field)
            .field("column_type", &self.column_type)
            .field("width", &self.width)
            .field("collation", &self.collation)
            .field("has_value_getter", &self.value_getter.is_some())
            .field("has_value_formatter", &self.value_formatter.is_some())
            .field("has_comparator", &self.comparator.is_some())
            .finish()
    }
}

impl ColumnDefinition {
    pub fn new(field: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            field: field.into(),
            column_type,
            width: 100.0,
            collation: Collation::default(),
            operators: None,
            aggregations: None,
            value_getter: None,
            value_formatter: None,
            comparator: None,
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = collation;
        self
    }

    pub fn with_operators(mut self, operators: Vec<FilterOperator>) -> Self {
        self.operators = Some(operators);
        self
    }

    pub fn with_aggregations(mut self, names: Vec<String>) -> Self {
        self.aggregations = Some(names);
        self
    }

    pub fn with_value_getter(mut self, getter: ValueGetter) -> Self {
        self.value_getter = Some(getter);
        self
    }

    pub fn with_value_formatter(mut self, formatter: ValueFormatter) -> Self {
        self.value_formatter = Some(formatter);
        self
    }

    pub fn with_comparator(mut self, comparator: CellComparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn supports_operator(&self, op: FilterOperator) -> bool {
        match &self.operators {
            Some(ops) => ops.contains(&op),
            None => self.column_type.caps().operators.contains(&op),
        }
    }

    /// Whether `name` may be aggregated on this column. Without an explicit
    /// override, builtins follow the type capabilities and custom names are
    /// allowed (the aggregation engine validates their registration).
    pub fn supports_aggregation(&self, name: &str) -> bool {
        match &self.aggregations {
            Some(names) => names.iter().any(|n| n == name),
            None => {
                if BUILTIN_AGGREGATIONS.contains(&name) {
                    self.column_type.caps().aggregations.contains(&name)
                } else {
                    true
                }
            }
        }
    }

    /// Cell value for `record`, through the value getter when present.
    pub fn cell_value(&self, record: &RowRecord, warn: &mut WarnOnce) -> CellValue {
        match &self.value_getter {
            Some(getter) => match getter(record) {
                Some(value) => value,
                None => {
                    warn.warn(format!(
                        "Value getter for column `{}` failed; substituting null",
                        self.field
                    ));
                    CellValue::Null
                }
            },
            None => record.get(&self.field).clone(),
        }
    }

    /// Display string for a value, through the formatter when present.
    pub fn format_value(&self, value: &CellValue, warn: &mut WarnOnce) -> String {
        match &self.value_formatter {
            Some(formatter) => match formatter(value) {
                Some(s) => s,
                None => {
                    warn.warn(format!(
                        "Formatter for column `{}` failed; using default formatting",
                        self.field
                    ));
                    value.display()
                }
            },
            None => value.display(),
        }
    }

    /// Compare two values of this column, through the custom comparator when
    /// present. A failing comparator yields `Equal` (stable order preserved).
    pub fn compare(&self, a: &CellValue, b: &CellValue, warn: &mut WarnOnce) -> Ordering {
        match &self.comparator {
            Some(cmp) => match cmp(a, b) {
                Some(ordering) => ordering,
                None => {
                    warn.warn(format!(
                        "Comparator for column `{}` failed; treating values as equal",
                        self.field
                    ));
                    Ordering::Equal
                }
            },
            None => default_compare(self.collation, a, b),
        }
    }
}

/// The active column set. Fields are unique; order is the display order.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<ColumnDefinition>,
    index: HashMap<String, usize>,
}

impl ColumnSet {
    pub fn new(columns: Vec<ColumnDefinition>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if index.insert(col.field.clone(), i).is_some() {
                return Err(GridError::DuplicateColumnField(col.field.clone()));
            }
        }
        Ok(Self { columns, index })
    }

    pub fn get(&self, field: &str) -> Option<&ColumnDefinition> {
        self.index.get(field).map(|&i| &self.columns[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caps_per_type() {
        assert!(ColumnType::String
            .caps()
            .operators
            .contains(&FilterOperator::Contains));
        assert!(!ColumnType::Number
            .caps()
            .operators
            .contains(&FilterOperator::Contains));
        assert!(ColumnType::Number.caps().aggregations.contains(&"avg"));
        assert!(!ColumnType::String.caps().aggregations.contains(&"avg"));
    }

    #[test]
    fn test_operator_override() {
        let col = ColumnDefinition::new("a", ColumnType::String)
            .with_operators(vec![FilterOperator::Equals]);
        assert!(col.supports_operator(FilterOperator::Equals));
        assert!(!col.supports_operator(FilterOperator::Contains));
    }

    #[test]
    fn test_default_compare_nulls_first() {
        let cmp = default_compare(
            Collation::CaseSensitive,
            &CellValue::Null,
            &CellValue::Number(-100.0),
        );
        assert_eq!(cmp, Ordering::Less);
    }

    #[test]
    fn test_case_insensitive_collation() {
        let a = CellValue::Text("apple".into());
        let b = CellValue::Text("Banana".into());
        assert_eq!(
            default_compare(Collation::CaseInsensitive, &a, &b),
            Ordering::Less
        );
        // Case-sensitive codepoint order puts uppercase first
        assert_eq!(
            default_compare(Collation::CaseSensitive, &a, &b),
            Ordering::Greater
        );
    }

    #[test]
    fn test_failing_comparator_degrades_to_equal() {
        let mut warn = WarnOnce::new();
        let col = ColumnDefinition::new("a", ColumnType::Number)
            .with_comparator(Arc::new(|_, _| None));
        let ord = col.compare(&CellValue::Number(1.0), &CellValue::Number(2.0), &mut warn);
        assert_eq!(ord, Ordering::Equal);
        assert_eq!(warn.distinct_count(), 1);
    }

    #[test]
    fn test_failing_getter_substitutes_null() {
        let mut warn = WarnOnce::new();
        let col =
            ColumnDefinition::new("a", ColumnType::Number).with_value_getter(Arc::new(|_| None));
        let record = RowRecord::new().with("a", 5.0);
        assert!(col.cell_value(&record, &mut warn).is_null());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = ColumnSet::new(vec![
            ColumnDefinition::new("a", ColumnType::Number),
            ColumnDefinition::new("a", ColumnType::String),
        ]);
        assert!(matches!(
            result,
            Err(GridError::DuplicateColumnField(field)) if field == "a"
        ));
    }

    #[test]
    fn test_custom_aggregation_allowed_without_override() {
        let col = ColumnDefinition::new("a", ColumnType::Number);
        assert!(col.supports_aggregation("sum"));
        assert!(col.supports_aggregation("p95"));
        let strict = ColumnDefinition::new("b", ColumnType::Number)
            .with_aggregations(vec!["sum".to_string()]);
        assert!(!strict.supports_aggregation("p95"));
        assert!(!strict.supports_aggregation("avg"));
    }
}
