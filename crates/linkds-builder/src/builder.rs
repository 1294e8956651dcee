//! Dataset builder
//!
//! Joins annotation records against the allow-set and page map, keeping only
//! links whose source and target entities are both allowed.

use tracing::{debug, warn};

use linkds_core::{AnnotationRecord, DatasetEntry, EntityId, LinkMap, Result, Section};

use crate::loader::{AllowSet, PageLookup, PageMap};
use crate::stats::BuildStats;

// ============================================================================
// Build context
// ============================================================================

/// Immutable lookup tables for one run
#[derive(Debug, Clone)]
pub struct BuildContext {
    allow_set: AllowSet,
    page_map: PageMap,
}

impl BuildContext {
    pub fn new(allow_set: AllowSet, page_map: PageMap) -> Self {
        Self {
            allow_set,
            page_map,
        }
    }

    /// Entity of a resolved page, if it is allowed
    fn allowed_entity<'a>(&self, lookup: PageLookup<'a>) -> Option<&'a EntityId> {
        match lookup {
            PageLookup::Mapped(entity) if self.allow_set.contains(entity) => Some(entity),
            _ => None,
        }
    }

    /// Produce the dataset entries for one record
    pub fn process_record(
        &self,
        record: &AnnotationRecord,
        stats: &mut BuildStats,
    ) -> Vec<DatasetEntry> {
        stats.records_read += 1;

        let lookup = self.page_map.lookup(&record.page_id);
        if lookup == PageLookup::Missing {
            warn!("page_id: {} not found in pages data", record.page_id);
            stats.records_missing_page += 1;
            return Vec::new();
        }
        if self.allowed_entity(lookup).is_none() {
            stats.records_filtered += 1;
            return Vec::new();
        }

        record
            .sections
            .iter()
            .filter_map(|section| self.process_section(section, stats))
            .collect()
    }

    /// Produce the entry for one section, or `None` if no link survives
    pub fn process_section(
        &self,
        section: &Section,
        stats: &mut BuildStats,
    ) -> Option<DatasetEntry> {
        stats.sections_read += 1;
        let mut links = LinkMap::new();

        for (target, span) in section.links() {
            stats.links_read += 1;

            let lookup = self.page_map.lookup(target);
            if lookup == PageLookup::Missing {
                warn!("page_id: {} not found in pages data", target);
                stats.links_missing_target += 1;
                continue;
            }
            let Some(entity) = self.allowed_entity(lookup) else {
                stats.links_filtered += 1;
                continue;
            };

            stats.links_kept += 1;
            if links.insert(span, entity.clone()) {
                stats.links_replaced += 1;
            }
        }

        if links.is_empty() {
            return None;
        }
        stats.sections_emitted += 1;
        Some(DatasetEntry::new(section.text.clone(), links))
    }
}

// ============================================================================
// Dataset builder
// ============================================================================

/// Accumulates dataset entries chunk by chunk
pub struct DatasetBuilder<'a> {
    context: &'a BuildContext,
    entries: Vec<DatasetEntry>,
    stats: BuildStats,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(context: &'a BuildContext) -> Self {
        Self {
            context,
            entries: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    /// Process one chunk of records
    pub fn extend(&mut self, chunk: &[AnnotationRecord]) {
        let mut chunk_stats = BuildStats::default();
        for record in chunk {
            let entries = self.context.process_record(record, &mut chunk_stats);
            self.entries.extend(entries);
        }

        debug!(
            records = chunk_stats.records_read,
            entries = chunk_stats.sections_emitted,
            "Processed chunk"
        );
        self.stats.merge(&chunk_stats);
    }

    pub fn finish(self) -> (Vec<DatasetEntry>, BuildStats) {
        (self.entries, self.stats)
    }
}

/// Run the whole stream through the builder
///
/// `on_chunk` is called after every chunk with the number of records in it.
/// The first stream error aborts the build.
pub fn build_dataset<I, F>(
    context: &BuildContext,
    chunks: I,
    mut on_chunk: F,
) -> Result<(Vec<DatasetEntry>, BuildStats)>
where
    I: IntoIterator<Item = Result<Vec<AnnotationRecord>>>,
    F: FnMut(usize),
{
    let mut builder = DatasetBuilder::new(context);
    for chunk in chunks {
        let chunk = chunk?;
        builder.extend(&chunk);
        on_chunk(chunk.len());
    }

    let (entries, stats) = builder.finish();
    debug!(entries = entries.len(), "Stream exhausted");
    Ok((entries, stats))
}

// ============================================================================
// Tests
// ============================================================================
