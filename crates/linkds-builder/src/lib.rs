//! linkds Builder - Entity-linking dataset construction
//!
//! Joins a link-annotated corpus with an entity allow-set and a page to
//! entity map, producing `(text, {"links": {span: {entity: weight}}})`
//! training entries.
//!
//! The pipeline is strictly sequential:
//! 1. [`loader`] reads the allow-set and page map into memory
//! 2. [`stream`] reads the corpus lazily in bounded chunks
//! 3. [`builder`] filters and re-keys links against a [`BuildContext`]
//! 4. [`writer`] serializes the collected entries in one step

pub mod builder;
pub mod loader;
pub mod pipeline;
pub mod stats;
pub mod stream;
pub mod writer;

pub use builder::{build_dataset, BuildContext, DatasetBuilder};
pub use loader::{
    load_allow_set, load_allow_set_csv, load_allow_set_serialized, load_page_map, AllowSet,
    PageLookup, PageMap,
};
pub use pipeline::{load_context, run, BuildInputs, BuildReport};
pub use stats::BuildStats;
pub use stream::{count_records, AnnotationStream};
pub use writer::{read_artifact, write_artifact, OutputTarget};
