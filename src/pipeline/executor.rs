//! Pipeline executor.
//!
//! Runs the fixed stage sequence over a draft snapshot. The executor tracks
//! the dirtiest stage since the last successful run and starts there —
//! a filter-model change re-runs filtering/sorting/aggregation against the
//! existing tree, while a rows or grouping change rebuilds it. A failed run
//! leaves the dirty marker in place so the next run retries the same span;
//! the caller only commits drafts from successful runs.

use crate::engines::{aggregate, filter, sort};
use crate::error::Result;
use crate::options::AggregationPosition;
use crate::pipeline::error::PipelineError;
use crate::pipeline::stage::{
    PipelineContext, PipelineDraft, ProcessorFn, RegistrationOutcome, Stage, StageRegistry,
};
use crate::tree::{build_row_tree, TreeBuildInput};

/// Orchestrates stage execution and dirty tracking.
pub struct PipelineExecutor {
    registry: StageRegistry,
    /// Earliest stage whose output is stale. `None` means fully clean.
    dirty_from: Option<Stage>,
    /// Bumped once per successful run.
    generation: u64,
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor {
    pub fn new() -> Self {
        Self {
            registry: StageRegistry::new(),
            // Everything is stale until the first run.
            dirty_from: Some(Stage::HydrateColumns),
            generation: 0,
        }
    }

    /// Register a processor. Adding or replacing dirties the stage and
    /// everything after it; re-registering an identical function does not.
    pub fn register_processor(
        &mut self,
        stage: Stage,
        name: impl Into<String>,
        func: ProcessorFn,
    ) -> RegistrationOutcome {
        let outcome = self.registry.register(stage, name, func);
        match outcome {
            RegistrationOutcome::Unchanged => {}
            RegistrationOutcome::Replaced | RegistrationOutcome::Added => self.mark_dirty(stage),
        }
        outcome
    }

    /// Mark `stage` (and implicitly everything downstream) stale.
    pub fn mark_dirty(&mut self, stage: Stage) {
        self.dirty_from = Some(match self.dirty_from {
            Some(current) => current.min(stage),
            None => stage,
        });
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_from.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Run all stale stages. Returns the transformed draft on success; on
    /// failure the draft is dropped, the dirty marker is kept and the error
    /// is surfaced — the caller's committed state stays untouched.
    pub fn run(
        &mut self,
        mut draft: PipelineDraft,
        ctx: &PipelineContext<'_>,
    ) -> Result<PipelineDraft> {
        let Some(start) = self.dirty_from else {
            return Ok(draft);
        };

        for stage in Stage::ALL.into_iter().filter(|&s| s >= start) {
            draft = self.run_stage(stage, draft, ctx)?;
        }

        self.generation += 1;
        self.dirty_from = None;
        tracing::debug!(
            "Pipeline run complete from `{}` (gen {})",
            start.name(),
            self.generation
        );
        Ok(draft)
    }

    fn run_stage(
        &self,
        stage: Stage,
        mut draft: PipelineDraft,
        ctx: &PipelineContext<'_>,
    ) -> Result<PipelineDraft> {
        // Built-in transformation for the stage
        match stage {
            Stage::HydrateColumns => {
                // Columns arrive validated; registered processors below may
                // rewrite the working set (e.g. inject a grouping column).
            }
            Stage::RowTreeCreation => {
                let with_footers = ctx.options.aggregation_position == AggregationPosition::Footer
                    && !ctx.models.grouping.is_empty()
                    && !ctx.models.aggregation.is_empty();
                draft.tree = build_row_tree(
                    &TreeBuildInput {
                        rows: ctx.rows,
                        columns: &draft.columns,
                        grouping: &ctx.models.grouping,
                        id_source: ctx.id_source,
                        with_footers,
                    },
                    &mut ctx.warn.borrow_mut(),
                )?;
            }
            Stage::Filtering => filter::apply(
                &mut draft.tree,
                ctx.rows,
                &draft.columns,
                &ctx.models.filter,
                &ctx.models.visibility,
                &mut ctx.warn.borrow_mut(),
            ),
            Stage::Sorting => sort::apply(
                &mut draft.tree,
                ctx.rows,
                &draft.columns,
                &ctx.models.sort,
                ctx.options.group_sort_policy,
                &mut ctx.warn.borrow_mut(),
            ),
            Stage::Aggregation => aggregate::apply(
                &mut draft.tree,
                ctx.rows,
                &draft.columns,
                &ctx.models.aggregation,
                ctx.aggregations,
                &mut ctx.warn.borrow_mut(),
            ),
        }

        // Registered processors compose left-to-right after the built-in.
        for entry in self.registry.processors(stage) {
            draft = (entry.func)(draft, ctx).map_err(|err| match err {
                already @ PipelineError::Processor { .. } => already,
                other => PipelineError::Processor {
                    stage: stage.name(),
                    name: entry.name.clone(),
                    message: other.to_string(),
                },
            })?;
        }
        Ok(draft)
    }
}
