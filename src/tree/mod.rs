//! Row tree: the hierarchical structure derived from flat rows.
//!
//! Nodes live in a flat `Vec` arena indexed by [`RowId`]; the synthetic root
//! holds top-level rows or groups as children. Structure is rebuilt wholesale
//! when raw rows or the grouping model change; filter/sort/aggregation runs
//! only annotate and reorder nodes in place.

pub mod builder;
pub mod node;

pub use builder::{build_row_tree, TreeBuildInput};
pub use node::{RowId, RowNode, RowNodeKind, RowTree};
