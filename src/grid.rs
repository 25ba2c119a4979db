//! Grid engine facade.
//!
//! [`GridEngine`] owns the inputs (rows, columns, models, geometry), the
//! processor and aggregation registries, and the versioned state store. It
//! is the single writer: every external mutation goes through a dedicated
//! mutator that marks the affected pipeline stage dirty, re-runs the stale
//! subset synchronously and commits the result — subscribers observe
//! committed state only, never a run in progress. Failed runs surface their
//! error and leave the previously committed state intact.

use crate::column::{ColumnDefinition, ColumnSet};
use crate::diag::WarnOnce;
use crate::engines::{
    flatten, paginate, virtualize, AggregationFn, AggregationRegistry, RenderContext, RowOffsets,
    Viewport,
};
use crate::error::Result;
use crate::model::{
    AggregationModel, ColumnVisibilityModel, FilterModel, GridModels, GroupingModel,
    PaginationModel, SortModel,
};
use crate::options::{AggregationPosition, GridOptions};
use crate::pipeline::{
    PipelineContext, PipelineDraft, PipelineExecutor, ProcessorFn, RegistrationOutcome, Stage,
};
use crate::snapshot::{ExpansionEntry, ExpansionSnapshot, GridStateSnapshot, ScrollPosition};
use crate::store::{StateSlice, StateStore, SubscriberFn, SubscriptionId};
use crate::tree::{RowId, RowNode, RowTree};
use crate::types::{RowIdSource, RowKey, RowRecord};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

/// Per-row height callback (variable row heights).
pub type RowHeightFn = Arc<dyn Fn(&RowKey) -> f64 + Send + Sync>;

/// One partial row update.
#[derive(Debug, Clone)]
pub enum RowUpdate {
    /// Replace the row with the same id, or append when the id is new.
    Upsert(RowRecord),
    /// Remove the row with this id. Unknown ids warn once and are skipped.
    Delete(RowKey),
}

/// The headless data-grid engine.
pub struct GridEngine {
    columns: ColumnSet,
    rows: Vec<RowRecord>,
    id_source: RowIdSource,
    options: GridOptions,
    models: GridModels,
    /// Explicit expand/collapse toggles layered over the default depth.
    expansion: HashMap<RowKey, bool>,
    viewport: Viewport,
    aggregations: AggregationRegistry,
    executor: PipelineExecutor,
    store: StateStore,
    warn: RefCell<WarnOnce>,
    row_height_fn: Option<RowHeightFn>,

    // Derived caches below the pipeline
    flat_ids: Vec<RowId>,
    page_range: Range<usize>,
    row_offsets: RowOffsets,

    // Dirt tracking for the post-pipeline phases
    flat_dirty: bool,
    virt_dirty: bool,
    raw_rows_changed: bool,
    columns_changed: bool,
    /// Scroll position at the last render-context computation; deltas below
    /// the threshold skip recomputation.
    last_scroll: (f64, f64),
}

impl GridEngine {
    /// Create an engine over a column schema. Fails on duplicate fields.
    pub fn new(columns: Vec<ColumnDefinition>, options: GridOptions) -> Result<Self> {
        let columns = ColumnSet::new(columns)?;
        let mut engine = Self {
            columns,
            rows: Vec::new(),
            id_source: RowIdSource::default(),
            options,
            models: GridModels::default(),
            expansion: HashMap::new(),
            viewport: Viewport::default(),
            aggregations: AggregationRegistry::new(),
            executor: PipelineExecutor::new(),
            store: StateStore::new(),
            warn: RefCell::new(WarnOnce::new()),
            row_height_fn: None,
            flat_ids: Vec::new(),
            page_range: 0..0,
            row_offsets: RowOffsets::default(),
            flat_dirty: true,
            virt_dirty: true,
            raw_rows_changed: false,
            columns_changed: true,
            last_scroll: (0.0, 0.0),
        };
        engine.refresh()?;
        Ok(engine)
    }

    // ── Input mutators ──

    /// Replace the raw row set. Fails (state unchanged) on duplicate or
    /// missing row ids.
    pub fn set_rows(&mut self, rows: Vec<RowRecord>) -> Result<()> {
        self.rows = rows;
        self.raw_rows_changed = true;
        self.executor.mark_dirty(Stage::RowTreeCreation);
        self.refresh()
    }

    /// Apply a batch of upserts and deletes keyed by row id.
    pub fn update_rows(&mut self, updates: Vec<RowUpdate>) -> Result<()> {
        let mut index: HashMap<RowKey, usize> = HashMap::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            if let Some(key) = self.id_source.key_for(row) {
                index.insert(key, i);
            }
        }

        let mut slots: Vec<Option<RowRecord>> = self.rows.drain(..).map(Some).collect();
        for update in updates {
            match update {
                RowUpdate::Upsert(record) => match self.id_source.key_for(&record) {
                    Some(key) => match index.get(&key) {
                        Some(&i) => slots[i] = Some(record),
                        None => {
                            index.insert(key, slots.len());
                            slots.push(Some(record));
                        }
                    },
                    None => self
                        .warn
                        .borrow_mut()
                        .warn("Row upsert without a resolvable id ignored"),
                },
                RowUpdate::Delete(key) => match index.get(&key) {
                    Some(&i) if slots[i].is_some() => slots[i] = None,
                    _ => self
                        .warn
                        .borrow_mut()
                        .warn(format!("Delete for unknown row id `{}` ignored", key)),
                },
            }
        }
        self.rows = slots.into_iter().flatten().collect();

        self.raw_rows_changed = true;
        self.executor.mark_dirty(Stage::RowTreeCreation);
        self.refresh()
    }

    /// Replace the column schema. Fails on duplicate fields.
    pub fn set_columns(&mut self, columns: Vec<ColumnDefinition>) -> Result<()> {
        self.columns = ColumnSet::new(columns)?;
        self.columns_changed = true;
        self.executor.mark_dirty(Stage::HydrateColumns);
        self.refresh()
    }

    pub fn set_row_id_source(&mut self, source: RowIdSource) -> Result<()> {
        self.id_source = source;
        self.raw_rows_changed = true;
        self.executor.mark_dirty(Stage::RowTreeCreation);
        self.refresh()
    }

    // ── Model mutators ──

    pub fn set_filter_model(&mut self, model: FilterModel) -> Result<()> {
        self.models.filter = model;
        self.executor.mark_dirty(Stage::Filtering);
        self.refresh()
    }

    /// Replace only the quick-filter terms, keeping structured clauses.
    pub fn set_quick_filter(&mut self, terms: Vec<String>) -> Result<()> {
        self.models.filter.quick_filter = terms;
        self.executor.mark_dirty(Stage::Filtering);
        self.refresh()
    }

    pub fn set_sort_model(&mut self, model: SortModel) -> Result<()> {
        self.models.sort = model;
        self.executor.mark_dirty(Stage::Sorting);
        self.refresh()
    }

    /// Replace the grouping model. Fails fast on duplicate grouping fields.
    pub fn set_grouping_model(&mut self, model: GroupingModel) -> Result<()> {
        model.validate()?;
        self.models.grouping = model;
        self.executor.mark_dirty(Stage::RowTreeCreation);
        self.refresh()
    }

    pub fn set_aggregation_model(&mut self, model: AggregationModel) -> Result<()> {
        self.models.aggregation = model;
        // Footer placement ties the tree shape to the aggregation model.
        if self.options.aggregation_position == AggregationPosition::Footer {
            self.executor.mark_dirty(Stage::RowTreeCreation);
        } else {
            self.executor.mark_dirty(Stage::Aggregation);
        }
        self.refresh()
    }

    pub fn set_pagination_model(&mut self, model: Option<PaginationModel>) -> Result<()> {
        self.models.pagination = model;
        self.virt_dirty = true;
        self.refresh()
    }

    pub fn set_column_visibility(&mut self, model: ColumnVisibilityModel) -> Result<()> {
        self.models.visibility = model;
        // Quick-filter matching reads visible columns; the column window
        // follows from the same run.
        self.executor.mark_dirty(Stage::Filtering);
        self.virt_dirty = true;
        self.refresh()
    }

    pub fn set_options(&mut self, options: GridOptions) -> Result<()> {
        self.options = options;
        self.executor.mark_dirty(Stage::RowTreeCreation);
        self.flat_dirty = true;
        self.virt_dirty = true;
        self.refresh()
    }

    // ── Expansion / geometry mutators ──

    /// Explicitly expand or collapse one group row.
    pub fn set_row_expansion(&mut self, key: RowKey, expanded: bool) -> Result<()> {
        self.expansion.insert(key, expanded);
        self.flat_dirty = true;
        self.refresh()
    }

    pub fn is_row_expanded(&self, key: &RowKey) -> bool {
        let tree = self.store.row_tree();
        match tree.find_by_key(key) {
            Some(id) => flatten::is_expanded(
                tree,
                id,
                &self.expansion,
                self.options.default_expansion_depth,
            ),
            None => false,
        }
    }

    /// Update viewport dimensions (resize).
    pub fn set_viewport_size(&mut self, width: f64, height: f64) -> Result<()> {
        self.viewport.width = width;
        self.viewport.height = height;
        self.virt_dirty = true;
        self.refresh()
    }

    /// Update the scroll offset. Recomputes the render context only when the
    /// offset moved at least the configured threshold on either axis.
    pub fn set_scroll(&mut self, top: f64, left: f64) -> Result<()> {
        self.viewport.scroll_top = top;
        self.viewport.scroll_left = left;
        let (last_top, last_left) = self.last_scroll;
        if (top - last_top).abs() >= self.options.scroll_threshold
            || (left - last_left).abs() >= self.options.scroll_threshold
        {
            self.virt_dirty = true;
            self.refresh()
        } else {
            Ok(())
        }
    }

    /// Install (or clear) a per-row height callback.
    pub fn set_row_height_fn(&mut self, f: Option<RowHeightFn>) -> Result<()> {
        self.row_height_fn = f;
        self.virt_dirty = true;
        self.refresh()
    }

    // ── Extension points ──

    /// Register a pipeline processor into a named stage (see the pipeline
    /// module for identity semantics). Recomputes only when the registration
    /// actually changed something.
    pub fn register_processor(
        &mut self,
        stage: Stage,
        name: impl Into<String>,
        func: ProcessorFn,
    ) -> Result<RegistrationOutcome> {
        let outcome = self.executor.register_processor(stage, name, func);
        if outcome != RegistrationOutcome::Unchanged {
            self.refresh()?;
        }
        Ok(outcome)
    }

    /// Register a custom aggregation function under a model name.
    pub fn register_aggregation(
        &mut self,
        name: impl Into<String>,
        func: AggregationFn,
    ) -> Result<()> {
        self.aggregations.register(name, func);
        self.executor.mark_dirty(Stage::Aggregation);
        self.refresh()
    }

    // ── Read API ──

    pub fn row_tree(&self) -> &RowTree {
        self.store.row_tree()
    }

    /// The full flattened visible row list (all pages).
    pub fn visible_rows(&self) -> &[RowKey] {
        self.store.visible_rows()
    }

    /// The current page's slice of the flattened list.
    pub fn page_rows(&self) -> &[RowKey] {
        &self.store.visible_rows()[self.page_range.clone()]
    }

    pub fn render_context(&self) -> RenderContext {
        self.store.render_context()
    }

    /// Pixel offset of a page-relative row index, for positioning rendered
    /// rows inside the scroll container.
    pub fn row_top(&self, index: usize) -> f64 {
        self.row_offsets.row_top(index)
    }

    /// Total pixel height of the current page's rows.
    pub fn total_row_height(&self) -> f64 {
        self.row_offsets.total_height()
    }

    /// Keys of leaves that passed filtering, in tree order.
    pub fn filtered_leaf_keys(&self) -> Vec<RowKey> {
        self.store
            .row_tree()
            .leaves()
            .filter(|n| n.visible)
            .map(|n| n.key.clone())
            .collect()
    }

    pub fn row_node(&self, key: &RowKey) -> Option<&RowNode> {
        let tree = self.store.row_tree();
        tree.find_by_key(key).and_then(|id| tree.get(id))
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn filter_model(&self) -> &FilterModel {
        &self.models.filter
    }

    pub fn sort_model(&self) -> &SortModel {
        &self.models.sort
    }

    pub fn grouping_model(&self) -> &GroupingModel {
        &self.models.grouping
    }

    pub fn aggregation_model(&self) -> &AggregationModel {
        &self.models.aggregation
    }

    pub fn version(&self, slice: StateSlice) -> u64 {
        self.store.version(slice)
    }

    pub fn global_version(&self) -> u64 {
        self.store.global_version()
    }

    pub fn subscribe(&mut self, slice: StateSlice, callback: SubscriberFn) -> SubscriptionId {
        self.store.subscribe(slice, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    // ── Snapshot API ──

    /// Export the full derived-state snapshot (models + expansion + scroll).
    pub fn export_state(&self) -> GridStateSnapshot {
        let mut overrides: Vec<ExpansionEntry> = self
            .expansion
            .iter()
            .map(|(key, &expanded)| ExpansionEntry {
                key: key.clone(),
                expanded,
            })
            .collect();
        overrides.sort_by(|a, b| a.key.cmp(&b.key));

        GridStateSnapshot {
            filter: self.models.filter.clone(),
            sort: self.models.sort.clone(),
            grouping: self.models.grouping.clone(),
            aggregation: self.models.aggregation.clone(),
            pagination: self.models.pagination,
            column_visibility: self.models.visibility.clone(),
            expansion: ExpansionSnapshot {
                default_depth: self.options.default_expansion_depth,
                overrides,
            },
            scroll: ScrollPosition {
                top: self.viewport.scroll_top,
                left: self.viewport.scroll_left,
            },
        }
    }

    /// Import a snapshot. On the same raw rows and columns this reproduces
    /// the identical flattened list and render context.
    pub fn import_state(&mut self, snapshot: GridStateSnapshot) -> Result<()> {
        snapshot.grouping.validate()?;
        self.models.filter = snapshot.filter;
        self.models.sort = snapshot.sort;
        self.models.grouping = snapshot.grouping;
        self.models.aggregation = snapshot.aggregation;
        self.models.pagination = snapshot.pagination;
        self.models.visibility = snapshot.column_visibility;
        self.options.default_expansion_depth = snapshot.expansion.default_depth;
        self.expansion = snapshot
            .expansion
            .overrides
            .into_iter()
            .map(|e| (e.key, e.expanded))
            .collect();
        self.viewport.scroll_top = snapshot.scroll.top;
        self.viewport.scroll_left = snapshot.scroll.left;

        self.executor.mark_dirty(Stage::RowTreeCreation);
        self.flat_dirty = true;
        self.virt_dirty = true;
        self.refresh()
    }

    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<()> {
        self.export_state().save(path)
    }

    pub fn load_state(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.import_state(GridStateSnapshot::load(path)?)
    }

    // ── Recompute ──

    /// Re-run the stale pipeline subset and the post-pipeline phases, then
    /// commit. On error nothing is committed and dirt is kept for the next
    /// attempt.
    fn refresh(&mut self) -> Result<()> {
        let mut new_tree: Option<RowTree> = None;
        let mut new_columns: Option<ColumnSet> = None;

        if self.executor.is_dirty() {
            let draft = PipelineDraft {
                columns: self.columns.clone(),
                tree: self.store.row_tree().clone(),
            };
            let ctx = PipelineContext {
                rows: &self.rows,
                models: &self.models,
                options: &self.options,
                aggregations: &self.aggregations,
                id_source: &self.id_source,
                warn: &self.warn,
            };
            let draft = self.executor.run(draft, &ctx)?;
            new_tree = Some(draft.tree);
            new_columns = Some(draft.columns);
            self.flat_dirty = true;
        }

        let mut new_visible: Option<Vec<RowKey>> = None;
        if self.flat_dirty {
            let tree = new_tree.as_ref().unwrap_or_else(|| self.store.row_tree());
            let flat = flatten::flatten(tree, &self.expansion, self.options.default_expansion_depth);
            let keys = flat.iter().map(|&id| tree.node(id).key.clone()).collect();
            self.flat_ids = flat;
            new_visible = Some(keys);
            self.virt_dirty = true;
        }

        let mut new_render: Option<RenderContext> = None;
        if self.virt_dirty {
            self.page_range = paginate::page_range(
                self.flat_ids.len(),
                self.models.pagination.as_ref(),
            );
            let tree = new_tree.as_ref().unwrap_or_else(|| self.store.row_tree());
            let page_ids = &self.flat_ids[self.page_range.clone()];
            let offsets = match &self.row_height_fn {
                Some(f) => {
                    let heights: Vec<f64> =
                        page_ids.iter().map(|&id| f(&tree.node(id).key)).collect();
                    RowOffsets::from_heights(&heights)
                }
                None => RowOffsets::fixed(page_ids.len(), self.options.row_height),
            };
            let columns = new_columns.as_ref().unwrap_or_else(|| self.store.columns());
            let widths: Vec<f64> = columns
                .iter()
                .filter(|c| self.models.visibility.is_visible(&c.field))
                .map(|c| c.width)
                .collect();
            new_render = Some(virtualize::compute(
                &offsets,
                &widths,
                &self.viewport,
                self.options.row_buffer,
                self.options.column_buffer,
            ));
            self.row_offsets = offsets;
            self.last_scroll = (self.viewport.scroll_top, self.viewport.scroll_left);
        }

        self.flat_dirty = false;
        self.virt_dirty = false;

        self.store.commit(crate::store::StoreCommit {
            tree: new_tree,
            columns: new_columns,
            columns_changed: std::mem::take(&mut self.columns_changed),
            visible_rows: new_visible,
            render_context: new_render,
            raw_rows_changed: std::mem::take(&mut self.raw_rows_changed),
        });
        Ok(())
    }
}

impl std::fmt::Debug for GridEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridEngine")
            .field("rows", &self.rows.len())
            .field("columns", &self.columns.len())
            .field("visible_rows", &self.store.visible_rows().len())
            .field("render_context", &self.store.render_context())
            .finish()
    }
}
