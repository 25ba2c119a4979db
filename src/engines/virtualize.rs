//! Virtualization/windowing engine.
//!
//! Maps scroll offset + viewport geometry to the minimal contiguous index
//! window over the flat row list (and the visible column list), extended by
//! a buffer on each end and clamped to `[0, len-1]`. Fixed row heights use
//! direct index arithmetic; variable heights go through prefix sums and
//! binary search. Degenerate geometry (NaN, negative sizes, empty lists)
//! yields the designated empty range rather than an error.

use serde::{Deserialize, Serialize};

/// Scroll offset and viewport dimensions, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_top: f64,
    pub scroll_left: f64,
}

/// The currently materialized index window. Row indices address the current
/// page of the flattened list; column indices address the visible column
/// order. `-1` on both ends of an axis is the designated empty range,
/// distinct from any degenerate single-item range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    pub first_row_index: i64,
    pub last_row_index: i64,
    pub first_column_index: i64,
    pub last_column_index: i64,
}

impl RenderContext {
    pub const EMPTY: RenderContext = RenderContext {
        first_row_index: -1,
        last_row_index: -1,
        first_column_index: -1,
        last_column_index: -1,
    };

    pub fn has_rows(&self) -> bool {
        self.first_row_index >= 0
    }

    pub fn has_columns(&self) -> bool {
        self.first_column_index >= 0
    }

    /// Number of materialized rows (0 for the empty range).
    pub fn row_count(&self) -> usize {
        if self.has_rows() {
            (self.last_row_index - self.first_row_index + 1) as usize
        } else {
            0
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Cumulative row offsets: `offsets[i]` is the top of row `i`,
/// `offsets[len]` the total height. Rebuilt when the flat list changes.
#[derive(Debug, Clone, Default)]
pub struct RowOffsets {
    offsets: Vec<f64>,
}

impl RowOffsets {
    /// Uniform row height. Non-finite or non-positive heights fall back to
    /// one pixel so index arithmetic stays well-defined.
    pub fn fixed(count: usize, row_height: f64) -> Self {
        let h = if row_height.is_finite() && row_height > 0.0 {
            row_height
        } else {
            1.0
        };
        let mut offsets = Vec::with_capacity(count + 1);
        for i in 0..=count {
            offsets.push(i as f64 * h);
        }
        Self { offsets }
    }

    /// Per-row heights. Negative or non-finite entries contribute zero.
    pub fn from_heights(heights: &[f64]) -> Self {
        let mut offsets = Vec::with_capacity(heights.len() + 1);
        let mut acc = 0.0;
        offsets.push(0.0);
        for &h in heights {
            if h.is_finite() && h > 0.0 {
                acc += h;
            }
            offsets.push(acc);
        }
        Self { offsets }
    }

    pub fn count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn total_height(&self) -> f64 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Top offset of row `index`.
    pub fn row_top(&self, index: usize) -> f64 {
        self.offsets.get(index).copied().unwrap_or(0.0)
    }

    /// Index of the row covering `offset`, clamped to `[0, count-1]`.
    /// Binary search over the cumulative offsets.
    pub fn index_at(&self, offset: f64) -> usize {
        let count = self.count();
        debug_assert!(count > 0);
        if !offset.is_finite() || offset <= 0.0 {
            return 0;
        }
        if offset >= self.total_height() {
            return count - 1;
        }
        // First index whose row bottom lies beyond the offset.
        let idx = self.offsets[1..].partition_point(|&bottom| bottom <= offset);
        idx.min(count - 1)
    }
}

/// Compute the render context for the current geometry.
pub fn compute(
    offsets: &RowOffsets,
    column_widths: &[f64],
    viewport: &Viewport,
    row_buffer: usize,
    column_buffer: usize,
) -> RenderContext {
    let (first_row, last_row) = row_range(offsets, viewport, row_buffer);
    let (first_col, last_col) = column_range(column_widths, viewport, column_buffer);
    RenderContext {
        first_row_index: first_row,
        last_row_index: last_row,
        first_column_index: first_col,
        last_column_index: last_col,
    }
}

fn row_range(offsets: &RowOffsets, viewport: &Viewport, buffer: usize) -> (i64, i64) {
    let count = offsets.count();
    if count == 0 || !viewport.height.is_finite() || viewport.height <= 0.0 {
        return (-1, -1);
    }
    let scroll = sanitize_scroll(viewport.scroll_top);
    let bottom = scroll + viewport.height;
    let first = offsets.index_at(scroll);
    let mut last = offsets.index_at(bottom);
    // A row whose top sits exactly at the viewport bottom is not visible.
    if last > first && offsets.row_top(last) >= bottom {
        last -= 1;
    }
    let first = first.saturating_sub(buffer);
    let last = (last + buffer).min(count - 1);
    (first as i64, last as i64)
}

fn column_range(widths: &[f64], viewport: &Viewport, buffer: usize) -> (i64, i64) {
    if widths.is_empty() || !viewport.width.is_finite() || viewport.width <= 0.0 {
        return (-1, -1);
    }
    let scroll = sanitize_scroll(viewport.scroll_left);
    let right_edge = scroll + viewport.width;

    let mut first = None;
    let mut last = 0usize;
    let mut left = 0.0;
    for (i, &w) in widths.iter().enumerate() {
        let w = if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let right = left + w;
        if right > scroll && first.is_none() {
            first = Some(i);
        }
        if left < right_edge {
            last = i;
        }
        left = right;
    }
    // Scrolled past all content: clamp to the last column.
    let first = first.unwrap_or(widths.len() - 1);
    let first = first.saturating_sub(buffer);
    let last = (last + buffer).min(widths.len() - 1);
    (first as i64, last.max(first) as i64)
}

fn sanitize_scroll(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(height: f64, scroll_top: f64) -> Viewport {
        Viewport {
            width: 500.0,
            height,
            scroll_top,
            scroll_left: 0.0,
        }
    }

    #[test]
    fn test_empty_list_is_empty_range() {
        let offsets = RowOffsets::fixed(0, 36.0);
        let ctx = compute(&offsets, &[100.0], &viewport(400.0, 0.0), 3, 0);
        assert_eq!(ctx.first_row_index, -1);
        assert_eq!(ctx.last_row_index, -1);
        assert!(!ctx.has_rows());
        assert_eq!(ctx.row_count(), 0);
    }

    #[test]
    fn test_fixed_height_window() {
        let offsets = RowOffsets::fixed(100, 10.0);
        // Rows 5..=14 visible, buffer 2 extends to 3..=16
        let ctx = compute(&offsets, &[100.0], &viewport(100.0, 50.0), 2, 0);
        assert_eq!(ctx.first_row_index, 3);
        assert_eq!(ctx.last_row_index, 16);
    }

    #[test]
    fn test_scroll_past_end_clamps() {
        let offsets = RowOffsets::fixed(10, 10.0);
        let ctx = compute(&offsets, &[100.0], &viewport(50.0, 10_000.0), 3, 0);
        assert!(ctx.first_row_index <= ctx.last_row_index);
        assert_eq!(ctx.last_row_index, 9);
    }

    #[test]
    fn test_negative_and_nan_geometry() {
        let offsets = RowOffsets::fixed(10, 10.0);
        let ctx = compute(&offsets, &[100.0], &viewport(-5.0, 0.0), 0, 0);
        assert_eq!(ctx.first_row_index, -1);

        let ctx = compute(&offsets, &[100.0], &viewport(f64::NAN, 0.0), 0, 0);
        assert_eq!(ctx.first_row_index, -1);

        // NaN scroll clamps to the top, not an error
        let ctx = compute(&offsets, &[100.0], &viewport(50.0, f64::NAN), 0, 0);
        assert_eq!(ctx.first_row_index, 0);
    }

    #[test]
    fn test_variable_heights_binary_search() {
        let offsets = RowOffsets::from_heights(&[10.0, 30.0, 10.0, 50.0]);
        assert_eq!(offsets.total_height(), 100.0);
        assert_eq!(offsets.index_at(0.0), 0);
        assert_eq!(offsets.index_at(9.9), 0);
        assert_eq!(offsets.index_at(10.0), 1);
        assert_eq!(offsets.index_at(45.0), 2);
        assert_eq!(offsets.index_at(99.9), 3);
        assert_eq!(offsets.index_at(1000.0), 3);
    }

    #[test]
    fn test_single_row_range_distinct_from_empty() {
        let offsets = RowOffsets::fixed(1, 36.0);
        let ctx = compute(&offsets, &[100.0], &viewport(400.0, 0.0), 3, 0);
        assert_eq!(ctx.first_row_index, 0);
        assert_eq!(ctx.last_row_index, 0);
        assert_eq!(ctx.row_count(), 1);
        assert_ne!(ctx, RenderContext::EMPTY);
    }

    #[test]
    fn test_column_window() {
        let widths = vec![100.0; 10];
        let vp = Viewport {
            width: 250.0,
            height: 100.0,
            scroll_top: 0.0,
            scroll_left: 320.0,
        };
        let offsets = RowOffsets::fixed(5, 10.0);
        let ctx = compute(&offsets, &widths, &vp, 0, 1);
        // Columns 3..=5 visible, buffer 1 extends to 2..=6
        assert_eq!(ctx.first_column_index, 2);
        assert_eq!(ctx.last_column_index, 6);
    }

    #[test]
    fn test_no_columns_is_empty_column_range() {
        let offsets = RowOffsets::fixed(5, 10.0);
        let ctx = compute(&offsets, &[], &viewport(100.0, 0.0), 0, 2);
        assert!(!ctx.has_columns());
        assert!(ctx.has_rows());
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_range_always_valid(
            count in 0usize..500,
            height in prop::num::f64::ANY,
            scroll in prop::num::f64::ANY,
            buffer in 0usize..10,
        ) {
            let offsets = RowOffsets::fixed(count, 24.0);
            let vp = Viewport { width: 300.0, height, scroll_top: scroll, scroll_left: 0.0 };
            let ctx = compute(&offsets, &[120.0, 80.0], &vp, buffer, 1);

            if ctx.has_rows() {
                prop_assert!(ctx.first_row_index <= ctx.last_row_index);
                prop_assert!(ctx.first_row_index >= 0);
                prop_assert!((ctx.last_row_index as usize) < count.max(1));
            } else {
                prop_assert_eq!(ctx.first_row_index, -1);
                prop_assert_eq!(ctx.last_row_index, -1);
            }
        }

        #[test]
        fn test_variable_offsets_monotonic(
            heights in prop::collection::vec(0.0f64..200.0, 1..100),
            offset in 0.0f64..30_000.0,
        ) {
            let offsets = RowOffsets::from_heights(&heights);
            let idx = offsets.index_at(offset);
            prop_assert!(idx < heights.len());
            // Monotonic: a larger offset never maps to a smaller index
            let idx2 = offsets.index_at(offset + 10.0);
            prop_assert!(idx2 >= idx);
        }
    }
}
