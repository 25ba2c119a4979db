//! # gridcore-rs: Headless Data-Grid Engine
//!
//! An incremental row/column pipeline for data grids: raw rows and a column
//! schema go in, a filtered/sorted/grouped/aggregated row tree, a flattened
//! visible row list and a virtualized render window come out. There is no
//! rendering here — a UI layer (DOM, TUI, canvas) consumes the derived
//! snapshots and draws them.
//!
//! ## Architecture
//!
//! ```text
//! rows/columns/models ──► pre-processing pipeline ──► row tree
//!   (hydrateColumns → rowTreeCreation → filtering → sorting → aggregation)
//!                                                        │
//!                flattener ◄─────────────────────────────┘
//!                    │ expansion state
//!                    ▼
//!              visible row list ──► pagination ──► virtualizer ──► render context
//! ```
//!
//! - **Single writer**: all mutation goes through [`GridEngine`] mutators;
//!   each one re-runs only the stale pipeline subset synchronously and
//!   commits atomically.
//! - **Versioned store**: derived slices carry monotonically increasing
//!   versions; subscribers are notified per slice, after commit only.
//! - **Extensible stages**: higher tiers register processors into named
//!   stages without modifying the core (see [`pipeline`]).
//! - **Graceful degradation**: misconfigured filter/sort/aggregation entries
//!   degrade to pass-through with deduplicated warnings; malformed input
//!   (duplicate row ids) fails the run and keeps prior state.
//!
//! ## Example
//!
//! ```ignore
//! use gridcore_rs::{
//!     ColumnDefinition, ColumnType, GridEngine, GridOptions, GroupingModel, RowRecord,
//! };
//!
//! let mut grid = GridEngine::new(
//!     vec![
//!         ColumnDefinition::new("id", ColumnType::Number),
//!         ColumnDefinition::new("country", ColumnType::String),
//!         ColumnDefinition::new("amount", ColumnType::Number),
//!     ],
//!     GridOptions::default(),
//! )?;
//!
//! grid.set_rows(vec![
//!     RowRecord::new().with("id", 1i64).with("country", "DE").with("amount", 10.0),
//!     RowRecord::new().with("id", 2i64).with("country", "FR").with("amount", 20.0),
//! ])?;
//! grid.set_grouping_model(GroupingModel { fields: vec!["country".into()] })?;
//! grid.set_viewport_size(800.0, 600.0)?;
//!
//! for key in grid.visible_rows() {
//!     println!("{key}");
//! }
//! let window = grid.render_context();
//! ```

pub mod column;
pub mod diag;
pub mod engines;
pub mod error;
pub mod grid;
pub mod model;
pub mod options;
pub mod pipeline;
pub mod snapshot;
pub mod store;
pub mod tree;
pub mod types;

// Re-export commonly used types
pub use column::{Collation, ColumnDefinition, ColumnType, FilterOperator};
pub use engines::{AggregationFn, AggregationRegistry, RenderContext, Viewport};
pub use error::{GridError, Result};
pub use grid::{GridEngine, RowHeightFn, RowUpdate};
pub use model::{
    AggregationModel, ColumnVisibilityModel, FilterClause, FilterModel, GroupingModel,
    LogicOperator, PaginationModel, SortDirection, SortItem, SortModel,
};
pub use options::{AggregationPosition, GridOptions, GroupSortPolicy};
pub use pipeline::{PipelineError, ProcessorFn, RegistrationOutcome, Stage};
pub use snapshot::GridStateSnapshot;
pub use store::{StateSlice, SubscriptionId};
pub use tree::{RowId, RowNode, RowNodeKind, RowTree};
pub use types::{CellValue, RowIdSource, RowKey, RowRecord};
