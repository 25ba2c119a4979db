//! Filter engine.
//!
//! Evaluates the filter model against every leaf, then propagates visibility
//! bottom-up: a group is visible iff at least one descendant leaf is. Nodes
//! are flagged in place, never removed — later stages (aggregation, footer
//! counts) need the full children list.
//!
//! Degradation rules: a clause naming an unknown column, using an operator
//! the column does not support, or carrying an unusable comparison value is
//! treated as always-true rather than an error. Hiding data because of a
//! misconfigured filter is worse than over-showing it.

use crate::column::{ColumnDefinition, ColumnSet, FilterOperator};
use crate::diag::WarnOnce;
use crate::model::{ColumnVisibilityModel, FilterModel, LogicOperator};
use crate::tree::RowTree;
use crate::types::{CellValue, RowRecord};
use std::cmp::Ordering;

/// One clause that survived validation, bound to its column.
struct ActiveClause<'a> {
    column: &'a ColumnDefinition,
    operator: FilterOperator,
    value: &'a CellValue,
}

/// Apply the filter model, rewriting every node's `visible` flag.
pub fn apply(
    tree: &mut RowTree,
    rows: &[RowRecord],
    columns: &ColumnSet,
    model: &FilterModel,
    visibility: &ColumnVisibilityModel,
    warn: &mut WarnOnce,
) {
    let clauses = resolve_clauses(columns, model, warn);
    let terms: Vec<String> = model
        .quick_filter
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    // Leaf pass
    let leaf_ids: Vec<_> = tree.iter().filter(|n| n.is_leaf()).map(|n| n.id).collect();
    for id in leaf_ids {
        let row_index = tree.node(id).row_index().unwrap_or(0);
        let row = &rows[row_index];
        let passes = clauses_pass(&clauses, model.operator, row, warn)
            && quick_filter_passes(&terms, row, columns, visibility, warn);
        tree.node_mut(id).visible = passes;
    }

    // Bottom-up propagation in one post-order pass; footers follow their
    // parent group afterwards.
    let order = tree.post_order();
    for &id in &order {
        if tree.node(id).is_group() {
            let any_visible = tree
                .children(id)
                .iter()
                .any(|&c| !tree.node(c).is_footer() && tree.node(c).visible);
            tree.node_mut(id).visible = any_visible;
        }
    }
    for &id in &order {
        if tree.node(id).is_footer() {
            let parent = tree.node(id).parent;
            let parent_visible = tree.node(parent).visible;
            tree.node_mut(id).visible = parent_visible;
        }
    }
    // The synthetic root is never emitted but stays visible so an all-leaf
    // tree keeps a well-formed ancestor chain.
    let root = tree.root();
    tree.node_mut(root).visible = true;
}

/// Validate clauses against the column schema. Invalid clauses are dropped
/// (pass-through) with a deduplicated warning.
fn resolve_clauses<'a>(
    columns: &'a ColumnSet,
    model: &'a FilterModel,
    warn: &mut WarnOnce,
) -> Vec<ActiveClause<'a>> {
    let mut active = Vec::with_capacity(model.clauses.len());
    for clause in &model.clauses {
        let Some(column) = columns.get(&clause.field) else {
            warn.warn(format!(
                "Filter clause references unknown column `{}`; treating as pass-through",
                clause.field
            ));
            continue;
        };
        if !column.supports_operator(clause.operator) {
            warn.warn(format!(
                "Column `{}` does not support filter operator {:?}; treating as pass-through",
                clause.field, clause.operator
            ));
            continue;
        }
        if !clause.operator.is_unary() && !value_usable(clause.operator, &clause.value) {
            warn.warn(format!(
                "Filter value for column `{}` is unusable with {:?}; treating as pass-through",
                clause.field, clause.operator
            ));
            continue;
        }
        active.push(ActiveClause {
            column,
            operator: clause.operator,
            value: &clause.value,
        });
    }
    active
}

/// Whether the comparison value can drive the operator at all.
fn value_usable(operator: FilterOperator, value: &CellValue) -> bool {
    use FilterOperator::*;
    match operator {
        GreaterThan | GreaterThanOrEqual | LessThan | LessThanOrEqual => {
            value.as_number().is_some()
        }
        After | OnOrAfter | Before | OnOrBefore => value.as_datetime().is_some(),
        // `Is` serves booleans and exact date matches
        Is => value.as_bool().is_some() || value.as_datetime().is_some(),
        IsEmpty | IsNotEmpty => true,
        _ => !value.is_null(),
    }
}

fn clauses_pass(
    clauses: &[ActiveClause<'_>],
    operator: LogicOperator,
    row: &RowRecord,
    warn: &mut WarnOnce,
) -> bool {
    if clauses.is_empty() {
        return true;
    }
    match operator {
        LogicOperator::And => clauses.iter().all(|c| clause_matches(c, row, warn)),
        LogicOperator::Or => clauses.iter().any(|c| clause_matches(c, row, warn)),
    }
}

fn clause_matches(clause: &ActiveClause<'_>, row: &RowRecord, warn: &mut WarnOnce) -> bool {
    use FilterOperator::*;
    let cell = clause.column.cell_value(row, warn);
    match clause.operator {
        IsEmpty => is_empty_cell(&cell),
        IsNotEmpty => !is_empty_cell(&cell),
        Contains => text_parts(clause, &cell).is_some_and(|(c, v)| c.contains(&v)),
        StartsWith => text_parts(clause, &cell).is_some_and(|(c, v)| c.starts_with(&v)),
        EndsWith => text_parts(clause, &cell).is_some_and(|(c, v)| c.ends_with(&v)),
        Equals | Is => {
            !cell.is_null() && clause.column.compare(&cell, clause.value, warn) == Ordering::Equal
        }
        NotEquals => {
            cell.is_null() || clause.column.compare(&cell, clause.value, warn) != Ordering::Equal
        }
        GreaterThan => number_parts(clause, &cell).is_some_and(|(c, v)| c > v),
        GreaterThanOrEqual => number_parts(clause, &cell).is_some_and(|(c, v)| c >= v),
        LessThan => number_parts(clause, &cell).is_some_and(|(c, v)| c < v),
        LessThanOrEqual => number_parts(clause, &cell).is_some_and(|(c, v)| c <= v),
        After => date_cmp(clause, &cell).is_some_and(|o| o == Ordering::Greater),
        OnOrAfter => date_cmp(clause, &cell).is_some_and(|o| o != Ordering::Less),
        Before => date_cmp(clause, &cell).is_some_and(|o| o == Ordering::Less),
        OnOrBefore => date_cmp(clause, &cell).is_some_and(|o| o != Ordering::Greater),
    }
}

fn is_empty_cell(cell: &CellValue) -> bool {
    cell.is_null() || cell.as_text() == Some("")
}

/// Case-folded (cell, value) strings for substring operators. A null cell
/// never matches.
fn text_parts(clause: &ActiveClause<'_>, cell: &CellValue) -> Option<(String, String)> {
    if cell.is_null() {
        return None;
    }
    Some((
        cell.display().to_lowercase(),
        clause.value.display().to_lowercase(),
    ))
}

fn number_parts(clause: &ActiveClause<'_>, cell: &CellValue) -> Option<(f64, f64)> {
    Some((cell.as_number()?, clause.value.as_number()?))
}

fn date_cmp(clause: &ActiveClause<'_>, cell: &CellValue) -> Option<Ordering> {
    Some(cell.as_datetime()?.cmp(clause.value.as_datetime()?))
}

/// Every term must match some visible column's formatted value.
fn quick_filter_passes(
    terms: &[String],
    row: &RowRecord,
    columns: &ColumnSet,
    visibility: &ColumnVisibilityModel,
    warn: &mut WarnOnce,
) -> bool {
    if terms.is_empty() {
        return true;
    }
    terms.iter().all(|term| {
        columns
            .iter()
            .filter(|col| visibility.is_visible(&col.field))
            .any(|col| {
                let cell = col.cell_value(row, warn);
                col.format_value(&cell, warn).to_lowercase().contains(term)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDefinition, ColumnType};
    use crate::model::FilterClause;
    use crate::tree::{build_row_tree, TreeBuildInput};
    use crate::types::{RowIdSource, RowKey};

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDefinition::new("id", ColumnType::Number),
            ColumnDefinition::new("name", ColumnType::String),
            ColumnDefinition::new("age", ColumnType::Number),
            ColumnDefinition::new("g", ColumnType::String),
        ])
        .unwrap()
    }

    fn rows() -> Vec<RowRecord> {
        vec![
            RowRecord::new()
                .with("id", 1i64)
                .with("name", "Ada")
                .with("age", 36.0)
                .with("g", "x"),
            RowRecord::new()
                .with("id", 2i64)
                .with("name", "Grace")
                .with("age", 45.0)
                .with("g", "x"),
            RowRecord::new()
                .with("id", 3i64)
                .with("name", "Linus")
                .with("age", 28.0)
                .with("g", "y"),
        ]
    }

    fn tree_for(rows: &[RowRecord], grouping: &[&str]) -> RowTree {
        let columns = columns();
        let grouping = crate::model::GroupingModel {
            fields: grouping.iter().map(|s| s.to_string()).collect(),
        };
        let mut warn = WarnOnce::new();
        build_row_tree(
            &TreeBuildInput {
                rows,
                columns: &columns,
                grouping: &grouping,
                id_source: &RowIdSource::default(),
                with_footers: false,
            },
            &mut warn,
        )
        .unwrap()
    }

    fn visible_leaf_keys(tree: &RowTree) -> Vec<RowKey> {
        tree.leaves()
            .filter(|n| n.visible)
            .map(|n| n.key.clone())
            .collect()
    }

    fn model(clauses: Vec<FilterClause>, operator: LogicOperator) -> FilterModel {
        FilterModel {
            clauses,
            operator,
            quick_filter: Vec::new(),
        }
    }

    #[test]
    fn test_numeric_clause() {
        let rows = rows();
        let mut tree = tree_for(&rows, &[]);
        let mut warn = WarnOnce::new();
        apply(
            &mut tree,
            &rows,
            &columns(),
            &model(
                vec![FilterClause::new(
                    "age",
                    FilterOperator::GreaterThan,
                    CellValue::Number(30.0),
                )],
                LogicOperator::And,
            ),
            &ColumnVisibilityModel::default(),
            &mut warn,
        );
        assert_eq!(
            visible_leaf_keys(&tree),
            vec![RowKey::Int(1), RowKey::Int(2)]
        );
    }

    #[test]
    fn test_or_combinator() {
        let rows = rows();
        let mut tree = tree_for(&rows, &[]);
        let mut warn = WarnOnce::new();
        apply(
            &mut tree,
            &rows,
            &columns(),
            &model(
                vec![
                    FilterClause::new("name", FilterOperator::Equals, "linus".into()),
                    FilterClause::new("age", FilterOperator::GreaterThan, CellValue::Number(40.0)),
                ],
                LogicOperator::Or,
            ),
            &ColumnVisibilityModel::default(),
            &mut warn,
        );
        // Case-insensitive equals matches Linus; age > 40 matches Grace
        assert_eq!(
            visible_leaf_keys(&tree),
            vec![RowKey::Int(2), RowKey::Int(3)]
        );
    }

    #[test]
    fn test_invalid_clause_passes_through() {
        let rows = rows();
        let mut tree = tree_for(&rows, &[]);
        let mut warn = WarnOnce::new();
        // Contains is not a number operator — clause must degrade to pass
        apply(
            &mut tree,
            &rows,
            &columns(),
            &model(
                vec![FilterClause::new(
                    "age",
                    FilterOperator::Contains,
                    CellValue::Number(3.0),
                )],
                LogicOperator::And,
            ),
            &ColumnVisibilityModel::default(),
            &mut warn,
        );
        assert_eq!(visible_leaf_keys(&tree).len(), 3);
        assert_eq!(warn.distinct_count(), 1);
    }

    #[test]
    fn test_group_visibility_propagates_bottom_up() {
        let rows = rows();
        let mut tree = tree_for(&rows, &["g"]);
        let mut warn = WarnOnce::new();
        apply(
            &mut tree,
            &rows,
            &columns(),
            &model(
                vec![FilterClause::new(
                    "name",
                    FilterOperator::StartsWith,
                    "li".into(),
                )],
                LogicOperator::And,
            ),
            &ColumnVisibilityModel::default(),
            &mut warn,
        );
        // Only Linus (group y) passes; group x must be invisible
        let top = tree.children(tree.root()).to_vec();
        let x = top
            .iter()
            .find(|&&g| tree.node(g).grouping_key() == Some(&CellValue::Text("x".into())))
            .copied()
            .unwrap();
        let y = top
            .iter()
            .find(|&&g| tree.node(g).grouping_key() == Some(&CellValue::Text("y".into())))
            .copied()
            .unwrap();
        assert!(!tree.node(x).visible);
        assert!(tree.node(y).visible);
    }

    #[test]
    fn test_quick_filter_matches_any_column() {
        let rows = rows();
        let mut tree = tree_for(&rows, &[]);
        let mut warn = WarnOnce::new();
        let model = FilterModel {
            quick_filter: vec!["gra".into()],
            ..Default::default()
        };
        apply(
            &mut tree,
            &rows,
            &columns(),
            &model,
            &ColumnVisibilityModel::default(),
            &mut warn,
        );
        assert_eq!(visible_leaf_keys(&tree), vec![RowKey::Int(2)]);
    }

    #[test]
    fn test_quick_filter_ignores_hidden_columns() {
        let rows = rows();
        let mut tree = tree_for(&rows, &[]);
        let mut warn = WarnOnce::new();
        let mut visibility = ColumnVisibilityModel::default();
        visibility.hide("name");
        let model = FilterModel {
            quick_filter: vec!["gra".into()],
            ..Default::default()
        };
        apply(&mut tree, &rows, &columns(), &model, &visibility, &mut warn);
        assert!(visible_leaf_keys(&tree).is_empty());
    }

    #[test]
    fn test_empty_model_restores_visibility() {
        let rows = rows();
        let mut tree = tree_for(&rows, &[]);
        let mut warn = WarnOnce::new();
        let narrowing = model(
            vec![FilterClause::new(
                "age",
                FilterOperator::LessThan,
                CellValue::Number(0.0),
            )],
            LogicOperator::And,
        );
        apply(
            &mut tree,
            &rows,
            &columns(),
            &narrowing,
            &ColumnVisibilityModel::default(),
            &mut warn,
        );
        assert!(visible_leaf_keys(&tree).is_empty());

        apply(
            &mut tree,
            &rows,
            &columns(),
            &FilterModel::default(),
            &ColumnVisibilityModel::default(),
            &mut warn,
        );
        assert_eq!(visible_leaf_keys(&tree).len(), 3);
    }
}
