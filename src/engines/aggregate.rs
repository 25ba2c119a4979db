//! Aggregation engine.
//!
//! Computes per-group summary values bottom-up over the filtered tree.
//! Each group aggregates the values of its visible descendant *leaves* —
//! recomputed from scratch per group, never merged from child aggregates,
//! so custom (non-associative) functions stay correct.
//!
//! Built-ins (`sum`, `avg`, `min`, `max`, `size`) exclude non-numeric and
//! missing values from numeric computations: `avg` over `[10, null, 20]` is
//! 15, not 10. `size` counts visible leaf rows regardless of cell content.
//! A failing custom function yields a null sentinel for that group and a
//! deduplicated warning; it never aborts the run.

use crate::column::{ColumnDefinition, ColumnSet, BUILTIN_AGGREGATIONS};
use crate::diag::WarnOnce;
use crate::model::AggregationModel;
use crate::tree::{RowId, RowTree};
use crate::types::{CellValue, RowRecord};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Custom aggregation: receives the visible leaf values for the field,
/// returns the aggregate or `None` on failure.
pub type AggregationFn = Arc<dyn Fn(&[CellValue]) -> Option<CellValue> + Send + Sync>;

/// Registry of caller-supplied aggregation functions, keyed by model name.
#[derive(Clone, Default)]
pub struct AggregationRegistry {
    custom: HashMap<String, AggregationFn>,
}

impl AggregationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a custom aggregation. Shadowing a built-in name
    /// is allowed; the custom function wins.
    pub fn register(&mut self, name: impl Into<String>, func: AggregationFn) {
        self.custom.insert(name.into(), func);
    }

    pub fn get(&self, name: &str) -> Option<&AggregationFn> {
        self.custom.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }
}

impl std::fmt::Debug for AggregationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

enum ResolvedFn<'a> {
    Builtin(&'static str),
    Custom(&'a AggregationFn),
}

struct ResolvedEntry<'a> {
    field: String,
    column: &'a ColumnDefinition,
    func: ResolvedFn<'a>,
}

/// Apply the aggregation model. Requires grouping to be active; with a flat
/// tree or an empty model this only clears stale annotations.
pub fn apply(
    tree: &mut RowTree,
    rows: &[RowRecord],
    columns: &ColumnSet,
    model: &AggregationModel,
    registry: &AggregationRegistry,
    warn: &mut WarnOnce,
) {
    tree.clear_aggregates();

    if model.is_empty() || !grouping_active(tree) {
        return;
    }

    let entries = resolve_entries(columns, model, registry, warn);
    if entries.is_empty() {
        return;
    }

    let order = tree.post_order();
    for entry in &entries {
        aggregate_field(tree, rows, &order, entry, warn);
    }
}

fn grouping_active(tree: &RowTree) -> bool {
    tree.children(tree.root())
        .iter()
        .any(|&id| tree.node(id).is_group())
}

fn resolve_entries<'a>(
    columns: &'a ColumnSet,
    model: &AggregationModel,
    registry: &'a AggregationRegistry,
    warn: &mut WarnOnce,
) -> Vec<ResolvedEntry<'a>> {
    let mut entries = Vec::with_capacity(model.fields.len());
    for (field, name) in &model.fields {
        let Some(column) = columns.get(field) else {
            warn.warn(format!(
                "Aggregation model references unknown column `{}`; entry ignored",
                field
            ));
            continue;
        };
        if !column.supports_aggregation(name) {
            warn.warn(format!(
                "Column `{}` does not allow aggregation `{}`; entry ignored",
                field, name
            ));
            continue;
        }
        // Custom registrations shadow builtins of the same name.
        let func = if let Some(custom) = registry.get(name) {
            ResolvedFn::Custom(custom)
        } else if let Some(&builtin) = BUILTIN_AGGREGATIONS.iter().find(|&&b| b == name) {
            ResolvedFn::Builtin(builtin)
        } else {
            warn.warn(format!(
                "Unknown aggregation function `{}` for column `{}`; entry ignored",
                name, field
            ));
            continue;
        };
        entries.push(ResolvedEntry {
            field: field.clone(),
            column,
            func,
        });
    }
    entries
}

/// One bottom-up pass for a single aggregated field. Every group's value
/// array holds all of its visible descendant leaves' cells; child arrays
/// drain into the parent's as the walk ascends.
fn aggregate_field(
    tree: &mut RowTree,
    rows: &[RowRecord],
    order: &[RowId],
    entry: &ResolvedEntry<'_>,
    warn: &mut WarnOnce,
) {
    let mut pending: HashMap<RowId, Vec<CellValue>> = HashMap::new();

    for &id in order {
        let node = tree.node(id);
        let parent = node.parent;
        if node.is_leaf() {
            if !node.visible {
                continue;
            }
            let row_index = node.row_index().unwrap_or(0);
            let value = entry.column.cell_value(&rows[row_index], warn);
            pending.entry(parent).or_default().push(value);
        } else if node.is_group() {
            let values = pending.remove(&id).unwrap_or_default();
            let aggregate = compute(entry, &values, warn);
            tree.node_mut(id)
                .aggregates
                .insert(entry.field.clone(), aggregate);
            if parent.is_valid() {
                pending.entry(parent).or_default().extend(values);
            }
        }
    }
}

fn compute(entry: &ResolvedEntry<'_>, values: &[CellValue], warn: &mut WarnOnce) -> CellValue {
    match &entry.func {
        ResolvedFn::Custom(func) => match func(values) {
            Some(value) => value,
            None => {
                warn.warn(format!(
                    "Custom aggregation for column `{}` failed; substituting null",
                    entry.field
                ));
                CellValue::Null
            }
        },
        ResolvedFn::Builtin(name) => builtin(name, entry.column, values, warn),
    }
}

fn builtin(
    name: &str,
    column: &ColumnDefinition,
    values: &[CellValue],
    warn: &mut WarnOnce,
) -> CellValue {
    match name {
        "size" => CellValue::Number(values.len() as f64),
        "sum" | "avg" => {
            let included: Vec<f64> = values.iter().filter_map(|v| v.as_number()).collect();
            if included.is_empty() {
                return CellValue::Null;
            }
            let sum: f64 = included.iter().sum();
            if name == "sum" {
                CellValue::Number(sum)
            } else {
                CellValue::Number(sum / included.len() as f64)
            }
        }
        "min" | "max" => {
            let mut best: Option<&CellValue> = None;
            for value in values.iter().filter(|v| !v.is_null()) {
                best = Some(match best {
                    None => value,
                    Some(current) => {
                        let ordering = column.compare(value, current, warn);
                        let take = if name == "min" {
                            ordering == Ordering::Less
                        } else {
                            ordering == Ordering::Greater
                        };
                        if take {
                            value
                        } else {
                            current
                        }
                    }
                });
            }
            best.cloned().unwrap_or(CellValue::Null)
        }
        _ => CellValue::Null,
    }
}
