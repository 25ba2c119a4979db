//! Pagination over the flattened list.
//!
//! Slices the flattened visible rows into the current page before the
//! virtualizer windows within it. An out-of-range page clamps to the last
//! non-empty page instead of rendering nothing.

use crate::model::PaginationModel;
use std::ops::Range;

/// Index range of the current page within a flat list of `len` rows.
pub fn page_range(len: usize, model: Option<&PaginationModel>) -> Range<usize> {
    let Some(model) = model.filter(|m| m.is_enabled()) else {
        return 0..len;
    };
    if len == 0 {
        return 0..0;
    }
    let last_page = (len - 1) / model.page_size;
    let page = model.page.min(last_page);
    let start = page * model.page_size;
    let end = (start + model.page_size).min(len);
    start..end
}
