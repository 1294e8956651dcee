//! End-to-end build run
//!
//! Loads the lookup tables, streams the corpus through the builder and
//! writes the artifact.

use std::path::PathBuf;

use tracing::{info, warn};

use linkds_core::{BuilderConfig, Result};

use crate::builder::{build_dataset, BuildContext};
use crate::loader::{load_allow_set, load_page_map};
use crate::stats::BuildStats;
use crate::stream::AnnotationStream;
use crate::writer::{write_artifact, OutputTarget};

/// Input files of one run
#[derive(Debug, Clone)]
pub struct BuildInputs {
    /// Allow-set table (`.csv`) or serialized set
    pub filtered_items: PathBuf,
    /// NDJSON corpus
    pub link_annotations: PathBuf,
    /// Page to entity table
    pub page_map: PathBuf,
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub artifact: PathBuf,
    pub entries: usize,
    pub stats: BuildStats,
}

/// Load the lookup tables named by `inputs`
pub fn load_context(inputs: &BuildInputs, config: &BuilderConfig) -> Result<BuildContext> {
    info!("Loading files...");
    let allow_set = load_allow_set(&inputs.filtered_items, &config.input.allow_columns)?;
    let page_map = load_page_map(&inputs.page_map, &config.input.page_entity_column)?;
    if allow_set.is_empty() || page_map.is_empty() {
        warn!(
            allowed = allow_set.len(),
            pages = page_map.len(),
            "Lookup table is empty, no entries will be produced"
        );
    }
    Ok(BuildContext::new(allow_set, page_map))
}

/// Run the full build
///
/// Nothing is written unless the whole corpus was processed.
pub fn run<F>(
    inputs: &BuildInputs,
    target: &OutputTarget,
    config: &BuilderConfig,
    on_chunk: F,
) -> Result<BuildReport>
where
    F: FnMut(usize),
{
    let context = load_context(inputs, config)?;

    info!("Generating dataset...");
    let stream = AnnotationStream::open(&inputs.link_annotations, config.input.chunk_size)?;
    let (entries, stats) = build_dataset(&context, stream, on_chunk)?;
    stats.log_summary();

    let artifact = write_artifact(&entries, target, config.output.format)?;
    Ok(BuildReport {
        artifact,
        entries: entries.len(),
        stats,
    })
}
