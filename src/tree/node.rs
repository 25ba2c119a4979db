//! Row node arena.
//!
//! `RowId` is a newtype over `u32` serving as a direct index into the tree's
//! node vector — O(1) lookup, `INVALID` as the null sentinel. The stable
//! external identity of a node is its [`RowKey`]; `RowId`s are internal and
//! never serialized.

use crate::types::{CellValue, RowKey};
use std::collections::HashMap;
use std::fmt;

/// Index into `RowTree::nodes`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RowId(pub u32);

impl RowId {
    pub const INVALID: RowId = RowId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "RowId(INVALID)")
        } else {
            write!(f, "RowId({})", self.0)
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Node variant: data row, group header or group footer.
#[derive(Debug, Clone, PartialEq)]
pub enum RowNodeKind {
    /// A data row; `row_index` points into the raw row slice.
    Leaf { row_index: usize },
    /// A group header produced by bucketing on `field`.
    Group { field: String, key: CellValue },
    /// Synthetic aggregation footer, pinned after its siblings.
    Footer,
}

/// One row or group header in the tree.
#[derive(Debug, Clone)]
pub struct RowNode {
    pub id: RowId,
    /// Stable external identity (user-supplied for leaves, auto-generated
    /// for group/footer/root nodes).
    pub key: RowKey,
    /// Parent node (`RowId::INVALID` only for the synthetic root).
    pub parent: RowId,
    /// Distance from the synthetic root (root = 0, top level = 1).
    pub depth: u16,
    pub kind: RowNodeKind,
    /// Ordered children; reordered in place by the sort engine, footer last.
    pub children: Vec<RowId>,
    /// First-seen position within the parent; final sort tiebreak, which
    /// keeps re-sorting deterministic and restores insertion order when the
    /// sort model empties.
    pub insertion_index: u32,
    /// Filter annotation. Nodes are flagged, never removed.
    pub visible: bool,
    /// Aggregated values keyed by field (group nodes only).
    pub aggregates: HashMap<String, CellValue>,
}

impl RowNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, RowNodeKind::Leaf { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, RowNodeKind::Group { .. })
    }

    pub fn is_footer(&self) -> bool {
        matches!(self.kind, RowNodeKind::Footer)
    }

    /// Grouping value for group nodes.
    pub fn grouping_key(&self) -> Option<&CellValue> {
        match &self.kind {
            RowNodeKind::Group { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Raw-row index for leaf nodes.
    pub fn row_index(&self) -> Option<usize> {
        match self.kind {
            RowNodeKind::Leaf { row_index } => Some(row_index),
            _ => None,
        }
    }

    pub fn aggregate(&self, field: &str) -> Option<&CellValue> {
        self.aggregates.get(field)
    }
}

pub(crate) const ROOT_KEY: &str = "auto-generated-root";

/// Flat-storage row tree with a synthetic single root.
///
/// - `RowId` is a direct index into `nodes`.
/// - `RowKey` lookups are O(1) via HashMap.
/// - Consumers read through `&self` accessors; mutation stays inside the
///   pipeline (single-writer).
#[derive(Debug, Clone)]
pub struct RowTree {
    nodes: Vec<RowNode>,
    key_index: HashMap<RowKey, RowId>,
    root: RowId,
}

impl Default for RowTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RowTree {
    pub fn new() -> Self {
        let root_key = RowKey::Str(ROOT_KEY.to_string());
        let root = RowNode {
            id: RowId(0),
            key: root_key.clone(),
            parent: RowId::INVALID,
            depth: 0,
            kind: RowNodeKind::Group {
                field: String::new(),
                key: CellValue::Null,
            },
            children: Vec::new(),
            insertion_index: 0,
            visible: true,
            aggregates: HashMap::new(),
        };
        let mut key_index = HashMap::new();
        key_index.insert(root_key, RowId(0));
        Self {
            nodes: vec![root],
            key_index,
            root: RowId(0),
        }
    }

    pub fn root(&self) -> RowId {
        self.root
    }

    /// Total number of nodes, synthetic root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root alone counts as empty.
        self.nodes.len() <= 1
    }

    /// Get a node by RowId (O(1) array index).
    #[inline]
    pub fn get(&self, id: RowId) -> Option<&RowNode> {
        if id.is_valid() {
            self.nodes.get(id.index())
        } else {
            None
        }
    }

    /// Mutable node access. Reserved for pipeline processors annotating the
    /// draft tree; consumers read committed state through `&self` only.
    #[inline]
    pub fn get_mut(&mut self, id: RowId) -> Option<&mut RowNode> {
        if id.is_valid() {
            self.nodes.get_mut(id.index())
        } else {
            None
        }
    }

    /// Internal indexed access; ids handed out by this tree are always valid.
    #[inline]
    pub(crate) fn node(&self, id: RowId) -> &RowNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: RowId) -> &mut RowNode {
        &mut self.nodes[id.index()]
    }

    /// Look up by stable key (O(1) HashMap).
    pub fn find_by_key(&self, key: &RowKey) -> Option<RowId> {
        self.key_index.get(key).copied()
    }

    pub fn children(&self, id: RowId) -> &[RowId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Iterate over all nodes (arena order, root first).
    pub fn iter(&self) -> impl Iterator<Item = &RowNode> {
        self.nodes.iter()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &RowNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    pub fn is_visible(&self, id: RowId) -> bool {
        self.get(id).map(|n| n.visible).unwrap_or(false)
    }

    /// Append a node under `parent`. Returns the new node's id.
    pub(crate) fn add_node(&mut self, parent: RowId, key: RowKey, kind: RowNodeKind) -> RowId {
        let id = RowId(self.nodes.len() as u32);
        let parent_depth = self.nodes[parent.index()].depth;
        let insertion_index = self.nodes[parent.index()].children.len() as u32;
        let node = RowNode {
            id,
            key: key.clone(),
            parent,
            depth: parent_depth + 1,
            kind,
            children: Vec::new(),
            insertion_index,
            visible: true,
            aggregates: HashMap::new(),
        };
        self.key_index.insert(key, id);
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Drop all aggregate annotations (fresh aggregation run).
    pub(crate) fn clear_aggregates(&mut self) {
        for node in &mut self.nodes {
            node.aggregates.clear();
        }
    }

    /// Node ids with every child preceding its parent (sibling order
    /// unspecified). Iterative; safe on arbitrarily deep trees.
    pub(crate) fn post_order(&self) -> Vec<RowId> {
        let mut stack = vec![self.root];
        let mut out = Vec::with_capacity(self.nodes.len());
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend_from_slice(&self.nodes[id.index()].children);
        }
        out.reverse();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(i: usize) -> RowNodeKind {
        RowNodeKind::Leaf { row_index: i }
    }

    #[test]
    fn test_row_id() {
        let id = RowId(42);
        assert!(id.is_valid());
        assert_eq!(id.index(), 42);
        assert!(!RowId::INVALID.is_valid());
    }

    #[test]
    fn test_new_tree_has_root_only() {
        let tree = RowTree::new();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        assert_eq!(tree.node(tree.root()).depth, 0);
        assert!(!tree.node(tree.root()).parent.is_valid());
    }

    #[test]
    fn test_add_node_links_and_depth() {
        let mut tree = RowTree::new();
        let root = tree.root();
        let a = tree.add_node(root, RowKey::Int(1), leaf(0));
        let b = tree.add_node(root, RowKey::Int(2), leaf(1));

        assert_eq!(tree.children(root), &[a, b]);
        assert_eq!(tree.node(a).depth, 1);
        assert_eq!(tree.node(a).insertion_index, 0);
        assert_eq!(tree.node(b).insertion_index, 1);
        assert_eq!(tree.node(a).parent, root);
        assert_eq!(tree.find_by_key(&RowKey::Int(2)), Some(b));
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn test_post_order_children_before_parents() {
        let mut tree = RowTree::new();
        let root = tree.root();
        let g = tree.add_node(
            root,
            RowKey::Str("g".into()),
            RowNodeKind::Group {
                field: "f".into(),
                key: CellValue::Text("x".into()),
            },
        );
        let l = tree.add_node(g, RowKey::Int(1), leaf(0));

        let order = tree.post_order();
        let pos = |id: RowId| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(l) < pos(g));
        assert!(pos(g) < pos(root));
        assert_eq!(order.len(), 3);
    }
}
