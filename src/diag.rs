//! Deduplicated warnings for recoverable degradations.
//!
//! Misconfigured filter clauses, unknown aggregation names and failing user
//! callbacks degrade functionality instead of erroring. Each distinct message
//! is logged once per engine instance so a bad clause evaluated against ten
//! thousand rows does not flood the log.

use std::collections::HashSet;

/// Per-engine warning deduplicator. Owned by the engine, never a global.
#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: HashSet<String>,
}

impl WarnOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` at WARN level unless an identical message was already
    /// logged through this instance.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.seen.insert(message.clone()) {
            tracing::warn!("{}", message);
        }
    }

    /// Number of distinct messages seen so far.
    pub fn distinct_count(&self) -> usize {
        self.seen.len()
    }
}
