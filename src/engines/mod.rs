//! Derived-state engines.
//!
//! Each engine is one pass over the row tree or the flattened list:
//! filtering annotates visibility, sorting reorders siblings, aggregation
//! fills group summaries, flattening produces the ordered visible list,
//! pagination slices it and virtualization windows it. The pipeline executor
//! invokes filter/sort/aggregate as built-in stage processors; flatten,
//! paginate and virtualize run on every commit after the pipeline.

pub mod aggregate;
pub mod filter;
pub mod flatten;
pub mod paginate;
pub mod sort;
pub mod virtualize;

pub use aggregate::{AggregationFn, AggregationRegistry};
pub use virtualize::{RenderContext, RowOffsets, Viewport};
