//! Run statistics
//!
//! Counters collected while joining the corpus against the lookup tables.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Counters for one build run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Records read from the corpus
    pub records_read: usize,
    /// Records whose page is not in the page map
    pub records_missing_page: usize,
    /// Records whose entity is unmapped or not allowed
    pub records_filtered: usize,
    /// Sections of surviving records
    pub sections_read: usize,
    /// Sections that produced a dataset entry
    pub sections_emitted: usize,
    /// Link occurrences in surviving records
    pub links_read: usize,
    /// Links whose target page is not in the page map
    pub links_missing_target: usize,
    /// Links whose target entity is unmapped or not allowed
    pub links_filtered: usize,
    /// Links that survived filtering, including ones later replaced
    pub links_kept: usize,
    /// Links that replaced an earlier link with the same span
    pub links_replaced: usize,
}

impl BuildStats {
    /// Records that passed the page filter
    pub fn records_kept(&self) -> usize {
        self.records_read - self.records_missing_page - self.records_filtered
    }

    /// Fold another set of counters into this one
    pub fn merge(&mut self, other: &BuildStats) {
        self.records_read += other.records_read;
        self.records_missing_page += other.records_missing_page;
        self.records_filtered += other.records_filtered;
        self.sections_read += other.sections_read;
        self.sections_emitted += other.sections_emitted;
        self.links_read += other.links_read;
        self.links_missing_target += other.links_missing_target;
        self.links_filtered += other.links_filtered;
        self.links_kept += other.links_kept;
        self.links_replaced += other.links_replaced;
    }

    /// Emit a summary at info level
    pub fn log_summary(&self) {
        info!(
            records_read = self.records_read,
            records_kept = self.records_kept(),
            records_missing_page = self.records_missing_page,
            records_filtered = self.records_filtered,
            "Record summary"
        );
        info!(
            sections_read = self.sections_read,
            sections_emitted = self.sections_emitted,
            links_read = self.links_read,
            links_kept = self.links_kept,
            links_missing_target = self.links_missing_target,
            links_filtered = self.links_filtered,
            links_replaced = self.links_replaced,
            "Link summary"
        );
    }
}
