//! Core value types shared across the engine.
//!
//! A grid cell holds a [`CellValue`]; a raw input row is a [`RowRecord`]
//! (field → value map); every row is identified by a stable [`RowKey`]
//! extracted through a [`RowIdSource`]. All of these are JSON-serializable —
//! they cross the engine boundary in models and state snapshots.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A single cell value.
///
/// The closed set of value variants the engine understands. Anything else a
/// caller wants to display must be projected into one of these through a
/// column value getter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view used by aggregation. Non-numeric and non-finite values
    /// are excluded from numeric computations, never coerced to zero.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&NaiveDateTime> {
        match self {
            CellValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Default display rendering, used when a column has no formatter.
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Canonical bucket key for grouping. Strict value equality, except that
    /// NaN normalizes to the "no value" bucket so bucketing stays total.
    pub(crate) fn bucket_key(&self) -> String {
        match self {
            CellValue::Null => "null".to_string(),
            CellValue::Bool(b) => format!("b:{}", b),
            CellValue::Number(n) if n.is_nan() => "null".to_string(),
            CellValue::Number(n) => format!("n:{}", n),
            CellValue::Text(s) => format!("s:{}", s),
            CellValue::DateTime(dt) => format!("d:{}", dt),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

/// Stable external identity of a row or synthetic node.
///
/// Survives tree rebuilds and state snapshot round-trips; the arena-index
/// `RowId` does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowKey {
    Int(i64),
    Str(String),
}

impl RowKey {
    /// Derive a key from a cell value. Integral numbers become `Int`; any
    /// other non-null value stringifies through its display form.
    pub fn from_cell(value: &CellValue) -> Option<RowKey> {
        match value {
            CellValue::Null => None,
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                Some(RowKey::Int(*n as i64))
            }
            CellValue::Text(s) if s.is_empty() => None,
            other => Some(RowKey::Str(other.display())),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Int(n) => write!(f, "{}", n),
            RowKey::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RowKey {
    fn from(n: i64) -> Self {
        RowKey::Int(n)
    }
}

impl From<&str> for RowKey {
    fn from(s: &str) -> Self {
        RowKey::Str(s.to_string())
    }
}

impl From<String> for RowKey {
    fn from(s: String) -> Self {
        RowKey::Str(s)
    }
}

/// A raw input row: field → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    values: HashMap<String, CellValue>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, convenient for fixtures and callers
    /// constructing rows inline.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        self.values.insert(field.into(), value.into());
    }

    /// A field absent from the record reads identically to an explicit null.
    pub fn get(&self, field: &str) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.values.get(field).unwrap_or(&NULL)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// How row ids are extracted from raw records: a designated field (default
/// `"id"`) or a caller-supplied accessor.
#[derive(Clone)]
pub enum RowIdSource {
    Field(String),
    Accessor(Arc<dyn Fn(&RowRecord) -> Option<RowKey> + Send + Sync>),
}

impl Default for RowIdSource {
    fn default() -> Self {
        RowIdSource::Field("id".to_string())
    }
}

impl fmt::Debug for RowIdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIdSource::Field(field) => write!(f, "RowIdSource::Field({:?})", field),
            RowIdSource::Accessor(_) => write!(f, "RowIdSource::Accessor(..)"),
        }
    }
}

impl RowIdSource {
    /// Resolve the key for a record, or `None` if the record has no usable id.
    pub fn key_for(&self, record: &RowRecord) -> Option<RowKey> {
        match self {
            RowIdSource::Field(field) => RowKey::from_cell(record.get(field)),
            RowIdSource::Accessor(f) => f(record),
        }
    }
}
