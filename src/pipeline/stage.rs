//! Stages, processor registration and the run context.
//!
//! A stage is a named slot in the fixed pipeline order. Registration keeps
//! processor identity: the processor's name is its identity, the `Arc`'d
//! function its revision. Swapping in a referentially different function
//! under an existing name replaces it and invalidates downstream caches;
//! handing back a clone of the already-registered `Arc` is a no-op.

use crate::column::ColumnSet;
use crate::diag::WarnOnce;
use crate::engines::AggregationRegistry;
use crate::model::GridModels;
use crate::options::GridOptions;
use crate::pipeline::error::PipelineResult;
use crate::tree::RowTree;
use crate::types::{RowIdSource, RowRecord};
use std::cell::RefCell;
use std::sync::Arc;

/// Named pipeline stages in fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    HydrateColumns,
    RowTreeCreation,
    Filtering,
    Sorting,
    Aggregation,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::HydrateColumns,
        Stage::RowTreeCreation,
        Stage::Filtering,
        Stage::Sorting,
        Stage::Aggregation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::HydrateColumns => "hydrateColumns",
            Stage::RowTreeCreation => "rowTreeCreation",
            Stage::Filtering => "filtering",
            Stage::Sorting => "sorting",
            Stage::Aggregation => "aggregation",
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The snapshot threaded through processors: the working column set and row
/// tree. Taken by value and returned, so a processor is a pure
/// snapshot-to-snapshot transform at the signature level.
#[derive(Debug, Clone)]
pub struct PipelineDraft {
    pub columns: ColumnSet,
    pub tree: RowTree,
}

/// Read-only context shared by every processor in a run.
pub struct PipelineContext<'a> {
    pub rows: &'a [RowRecord],
    pub models: &'a GridModels,
    pub options: &'a GridOptions,
    pub aggregations: &'a AggregationRegistry,
    pub id_source: &'a RowIdSource,
    /// Shared warning deduplicator; engines borrow it per call.
    pub warn: &'a RefCell<WarnOnce>,
}

/// A registered processor: snapshot in, snapshot out.
pub type ProcessorFn =
    Arc<dyn Fn(PipelineDraft, &PipelineContext<'_>) -> PipelineResult<PipelineDraft> + Send + Sync>;

pub(crate) struct ProcessorEntry {
    pub name: String,
    pub func: ProcessorFn,
}

/// What a registration call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Same name, referentially identical function: nothing to recompute.
    Unchanged,
    /// Same name, different function: downstream caches are stale.
    Replaced,
    /// New processor appended to the stage.
    Added,
}

/// Ordered processor lists per stage. Registration order within a stage is
/// execution order.
#[derive(Default)]
pub struct StageRegistry {
    stages: [Vec<ProcessorEntry>; Stage::ALL.len()],
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        stage: Stage,
        name: impl Into<String>,
        func: ProcessorFn,
    ) -> RegistrationOutcome {
        let name = name.into();
        let entries = &mut self.stages[stage.index()];
        match entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => {
                if Arc::ptr_eq(&existing.func, &func) {
                    RegistrationOutcome::Unchanged
                } else {
                    existing.func = func;
                    RegistrationOutcome::Replaced
                }
            }
            None => {
                entries.push(ProcessorEntry { name, func });
                RegistrationOutcome::Added
            }
        }
    }

    pub(crate) fn processors(&self, stage: Stage) -> &[ProcessorEntry] {
        &self.stages[stage.index()]
    }

    pub fn processor_count(&self, stage: Stage) -> usize {
        self.stages[stage.index()].len()
    }
}
