//! Visible rows flattener.
//!
//! Depth-first pre-order walk of the filtered/sorted/aggregated tree,
//! producing the flat ordered id list the virtualizer indexes. Iterative
//! with an explicit stack — deep trees must not recurse. Collapsed groups
//! contribute only their own row; invisible nodes are skipped entirely
//! (no hidden placeholders).

use crate::tree::{RowId, RowTree};
use crate::types::RowKey;
use std::collections::HashMap;

/// Whether a group starts expanded: explicit per-row toggles first, then the
/// default expansion depth (`-1` expands everything).
pub fn is_expanded(
    tree: &RowTree,
    id: RowId,
    overrides: &HashMap<RowKey, bool>,
    default_depth: i32,
) -> bool {
    let node = tree.node(id);
    if let Some(&expanded) = overrides.get(&node.key) {
        return expanded;
    }
    default_depth < 0 || (node.depth as i32) <= default_depth
}

/// Flatten the tree into the ordered list of visible node ids.
pub fn flatten(
    tree: &RowTree,
    overrides: &HashMap<RowKey, bool>,
    default_depth: i32,
) -> Vec<RowId> {
    let mut out = Vec::new();
    let mut stack: Vec<RowId> = Vec::new();

    // Root is synthetic and never emitted; start from its children.
    push_reversed(&mut stack, tree.children(tree.root()));

    while let Some(id) = stack.pop() {
        let node = tree.node(id);
        if !node.visible {
            continue;
        }
        out.push(id);
        if node.is_group() && is_expanded(tree, id, overrides, default_depth) {
            // Children were pushed reversed so they pop in order; the footer
            // sits last among children and therefore emits last.
            push_reversed(&mut stack, &node.children);
        }
    }
    out
}

fn push_reversed(stack: &mut Vec<RowId>, children: &[RowId]) {
    stack.extend(children.iter().rev());
}
