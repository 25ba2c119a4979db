//! Versioned derived-state store.
//!
//! Every derived value (hydrated columns, row tree, flattened visible rows,
//! render context) is a slice of this store. A global counter increments on
//! every committed slice mutation; each slice remembers the counter value of
//! its last change. Subscribers attach to one slice and are notified only
//! when that slice's version moves, and only after a full pipeline commit —
//! intermediate state is never observable.
//!
//! The store is owned by the engine and passed by reference; there is no
//! global instance.

use crate::column::ColumnSet;
use crate::engines::RenderContext;
use crate::tree::RowTree;
use crate::types::RowKey;
use std::fmt;

/// Addressable slices of derived state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSlice {
    RawRows,
    Columns,
    RowTree,
    VisibleRows,
    RenderContext,
}

impl StateSlice {
    pub const ALL: [StateSlice; 5] = [
        StateSlice::RawRows,
        StateSlice::Columns,
        StateSlice::RowTree,
        StateSlice::VisibleRows,
        StateSlice::RenderContext,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Slice-change callback; receives the slice's new version.
pub type SubscriberFn = Box<dyn FnMut(u64)>;

/// Handle returned by [`StateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    slice: StateSlice,
    callback: SubscriberFn,
}

/// A batch of slice updates applied atomically by [`StateStore::commit`].
#[derive(Default)]
pub(crate) struct StoreCommit {
    pub tree: Option<RowTree>,
    pub columns: Option<ColumnSet>,
    /// Bump the Columns version (the working set itself is refreshed on
    /// every pipeline run, but only schema changes are an observable event).
    pub columns_changed: bool,
    pub visible_rows: Option<Vec<RowKey>>,
    pub render_context: Option<RenderContext>,
    pub raw_rows_changed: bool,
}

/// The versioned container for all derived grid state.
pub struct StateStore {
    tree: RowTree,
    columns: ColumnSet,
    visible_rows: Vec<RowKey>,
    render_context: RenderContext,
    versions: [u64; StateSlice::ALL.len()],
    version: u64,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("version", &self.version)
            .field("versions", &self.versions)
            .field("visible_rows", &self.visible_rows.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            tree: RowTree::new(),
            columns: ColumnSet::default(),
            visible_rows: Vec::new(),
            render_context: RenderContext::EMPTY,
            versions: [0; StateSlice::ALL.len()],
            version: 0,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    // ── Read API ──

    pub fn row_tree(&self) -> &RowTree {
        &self.tree
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn visible_rows(&self) -> &[RowKey] {
        &self.visible_rows
    }

    pub fn render_context(&self) -> RenderContext {
        self.render_context
    }

    /// Version of one slice: the global counter value at its last change.
    pub fn version(&self, slice: StateSlice) -> u64 {
        self.versions[slice.index()]
    }

    /// Monotonic counter over all committed mutations.
    pub fn global_version(&self) -> u64 {
        self.version
    }

    // ── Subscriptions ──

    pub fn subscribe(&mut self, slice: StateSlice, callback: SubscriberFn) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push(Subscriber {
            id,
            slice,
            callback,
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    // ── Commit ──

    /// Apply a batch of slice updates, bump versions for the slices whose
    /// content actually changed, then notify affected subscribers.
    pub(crate) fn commit(&mut self, batch: StoreCommit) {
        let mut changed = [false; StateSlice::ALL.len()];

        if batch.raw_rows_changed {
            changed[StateSlice::RawRows.index()] = true;
        }
        if let Some(columns) = batch.columns {
            self.columns = columns;
            if batch.columns_changed {
                changed[StateSlice::Columns.index()] = true;
            }
        }
        if let Some(tree) = batch.tree {
            self.tree = tree;
            changed[StateSlice::RowTree.index()] = true;
        }
        if let Some(visible) = batch.visible_rows {
            if visible != self.visible_rows {
                self.visible_rows = visible;
                changed[StateSlice::VisibleRows.index()] = true;
            }
        }
        if let Some(ctx) = batch.render_context {
            if ctx != self.render_context {
                self.render_context = ctx;
                changed[StateSlice::RenderContext.index()] = true;
            }
        }

        for slice in StateSlice::ALL {
            if changed[slice.index()] {
                self.version += 1;
                self.versions[slice.index()] = self.version;
            }
        }

        // Notify after all versions are in place. Callbacks must not observe
        // a half-applied commit, so subscribers are detached for the calls.
        let mut subscribers = std::mem::take(&mut self.subscribers);
        for sub in &mut subscribers {
            if changed[sub.slice.index()] {
                (sub.callback)(self.versions[sub.slice.index()]);
            }
        }
        // Keep subscriptions added from within callbacks.
        subscribers.extend(std::mem::take(&mut self.subscribers));
        self.subscribers = subscribers;
    }
}
