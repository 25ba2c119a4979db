//! Pre-processing pipeline.
//!
//! Raw inputs flow through a fixed sequence of named stages, each producing
//! the next derived snapshot:
//!
//! ```text
//! [hydrateColumns] ──► [rowTreeCreation] ──► [filtering] ──► [sorting] ──► [aggregation]
//! ```
//!
//! # Design
//!
//! - **Built-in work first, registered processors after** — each stage runs
//!   its core transformation, then every registered processor for that stage
//!   in registration order. Higher tiers extend stages without touching the
//!   core.
//! - **Ownership threading** — processors take the draft by value and return
//!   a new one. Pure snapshot-to-snapshot at the contract level; free to
//!   mutate in place internally.
//! - **Identity-aware registration** — re-registering the same function
//!   under the same name is a no-op; a different function invalidates the
//!   stage and everything downstream.
//! - **Abort on failure** — the first processor error ends the run; the
//!   caller keeps the previously committed state.
//! - **Incremental re-runs** — the executor tracks the dirtiest stage and
//!   re-executes only from there.

pub mod error;
pub mod executor;
pub mod stage;

pub use error::{PipelineError, PipelineResult};
pub use executor::PipelineExecutor;
pub use stage::{
    PipelineContext, PipelineDraft, ProcessorFn, RegistrationOutcome, Stage, StageRegistry,
};
