//! Sort engine.
//!
//! Reorders every node's `children` in place, siblings only — rows never
//! move across parents. The comparator chain follows the sort model left to
//! right; the final tiebreak is the node's first-seen insertion index, which
//! makes re-sorting an already-sorted tree deterministic and restores
//! insertion order when the model empties. Footers stay pinned last.

use crate::column::{ColumnDefinition, ColumnSet};
use crate::diag::WarnOnce;
use crate::model::{SortDirection, SortModel};
use crate::options::GroupSortPolicy;
use crate::tree::{RowId, RowNode, RowNodeKind, RowTree};
use crate::types::{CellValue, RowRecord};
use std::cmp::Ordering;

/// One sort-model entry bound to its column.
struct ActiveSortItem<'a> {
    column: &'a ColumnDefinition,
    direction: SortDirection,
}

/// Apply the sort model to every sibling list in the tree.
pub fn apply(
    tree: &mut RowTree,
    rows: &[RowRecord],
    columns: &ColumnSet,
    model: &SortModel,
    policy: GroupSortPolicy,
    warn: &mut WarnOnce,
) {
    let items = resolve_items(columns, model, warn);

    let parent_ids: Vec<RowId> = tree
        .iter()
        .filter(|n| n.children.len() > 1)
        .map(|n| n.id)
        .collect();

    for parent in parent_ids {
        let mut children = std::mem::take(&mut tree.node_mut(parent).children);
        children.sort_by(|&a, &b| compare_nodes(tree, rows, &items, policy, a, b, warn));
        tree.node_mut(parent).children = children;
    }
}

fn resolve_items<'a>(
    columns: &'a ColumnSet,
    model: &SortModel,
    warn: &mut WarnOnce,
) -> Vec<ActiveSortItem<'a>> {
    let mut items = Vec::with_capacity(model.items.len());
    for item in &model.items {
        match columns.get(&item.field) {
            Some(column) => items.push(ActiveSortItem {
                column,
                direction: item.direction,
            }),
            None => warn.warn(format!(
                "Sort model references unknown column `{}`; entry ignored",
                item.field
            )),
        }
    }
    items
}

fn compare_nodes(
    tree: &RowTree,
    rows: &[RowRecord],
    items: &[ActiveSortItem<'_>],
    policy: GroupSortPolicy,
    a: RowId,
    b: RowId,
    warn: &mut WarnOnce,
) -> Ordering {
    let na = tree.node(a);
    let nb = tree.node(b);

    // Footers sort after everything else among their siblings.
    match (na.is_footer(), nb.is_footer()) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (true, true) => return insertion_order(na, nb),
        (false, false) => {}
    }

    if policy == GroupSortPolicy::LeavesOnly && (na.is_group() || nb.is_group()) {
        return insertion_order(na, nb);
    }

    for item in items {
        let va = sort_value(na, item.column, rows, warn);
        let vb = sort_value(nb, item.column, rows, warn);
        let mut ordering = item.column.compare(&va, &vb, warn);
        if item.direction == SortDirection::Desc {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    insertion_order(na, nb)
}

fn insertion_order(a: &RowNode, b: &RowNode) -> Ordering {
    a.insertion_index.cmp(&b.insertion_index)
}

/// Sort key of a node for one column. Leaves read their cell; a group node
/// orders by its grouping key when the sort column is its grouping field and
/// is otherwise neutral (null), leaving the insertion tiebreak in charge.
fn sort_value(
    node: &RowNode,
    column: &ColumnDefinition,
    rows: &[RowRecord],
    warn: &mut WarnOnce,
) -> CellValue {
    match &node.kind {
        RowNodeKind::Leaf { row_index } => column.cell_value(&rows[*row_index], warn),
        RowNodeKind::Group { field, key } if field == &column.field => key.clone(),
        _ => CellValue::Null,
    }
}
