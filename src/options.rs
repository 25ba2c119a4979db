//! Engine configuration.
//!
//! [`GridOptions`] collects the knobs that shape derived state: geometry
//! defaults for the virtualizer, sort policy for group rows, aggregation row
//! placement and the initial expansion depth. All fields are serde-backed so
//! options can be persisted alongside state snapshots.

use serde::{Deserialize, Serialize};

/// Whether group rows participate in sorting or keep their first-seen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum GroupSortPolicy {
    /// Sort group rows and leaf rows alike.
    #[default]
    SortAll,
    /// Keep insertion order for groups, sort only leaves.
    LeavesOnly,
}

/// Where aggregated values surface in the flattened output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AggregationPosition {
    /// Values readable on the group row itself.
    #[default]
    Inline,
    /// A synthetic footer row is emitted after each expanded group's children.
    Footer,
}

/// Engine options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridOptions {
    /// Fixed row height in pixels; ignored when a row-height callback is set.
    pub row_height: f64,

    /// Extra rows materialized above and below the visible window.
    pub row_buffer: usize,

    /// Extra columns materialized on each side of the visible window.
    pub column_buffer: usize,

    /// Minimum scroll delta (pixels, either axis) before the render context
    /// is recomputed. Keeps per-pixel scroll events from thrashing.
    pub scroll_threshold: f64,

    pub group_sort_policy: GroupSortPolicy,

    pub aggregation_position: AggregationPosition,

    /// Group depths expanded by default: `-1` expands everything, `0`
    /// collapses everything, `n` expands groups at depth ≤ n. Explicit
    /// per-row toggles override this.
    pub default_expansion_depth: i32,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            row_height: 36.0,
            row_buffer: 3,
            column_buffer: 2,
            scroll_threshold: 8.0,
            group_sort_policy: GroupSortPolicy::default(),
            aggregation_position: AggregationPosition::default(),
            default_expansion_depth: 0,
        }
    }
}
