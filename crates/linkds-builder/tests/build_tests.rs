//! Builder Integration Tests
//!
//! Runs the full pipeline over small corpora written to temporary
//! directories and checks the artifact contents.

use std::path::{Path, PathBuf};

use linkds_builder::{
    read_artifact, run, AllowSet, BuildContext, BuildInputs, BuildStats, OutputTarget, PageMap,
};
use linkds_core::{
    AnnotationRecord, ArtifactFormat, BuilderConfig, DatasetEntry, EntityId, LinkdsError, PageId,
    Section, Span,
};
use proptest::prelude::*;
use tempfile::TempDir;

/// Helper to lay out the three input files
fn write_inputs(dir: &Path, filtered: &str, pages: &str, corpus: &str) -> BuildInputs {
    let inputs = BuildInputs {
        filtered_items: dir.join("filtered_items.csv"),
        link_annotations: dir.join("link_annotations.jsonl"),
        page_map: dir.join("page_map.csv"),
    };
    std::fs::write(&inputs.filtered_items, filtered).unwrap();
    std::fs::write(&inputs.page_map, pages).unwrap();
    std::fs::write(&inputs.link_annotations, corpus).unwrap();
    inputs
}

const FILTERED: &str = "qid,Work_of_art\nQ1,\n,Q2\n";
const PAGES: &str = "page_id,item_id\nP1,Q1\nP2,Q2\nP3,Q3\n";

fn output_dir(root: &TempDir) -> PathBuf {
    let out = root.path().join("out");
    std::fs::create_dir(&out).unwrap();
    out
}

fn run_mode_a(inputs: &BuildInputs, out: &Path) -> Vec<DatasetEntry> {
    let config = BuilderConfig::default();
    let report = run(
        inputs,
        &OutputTarget::Directory(out.to_path_buf()),
        &config,
        |_| {},
    )
    .unwrap();
    assert_eq!(report.artifact, out.join("dataset.pkl"));
    read_artifact(&report.artifact, ArtifactFormat::Bincode).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_disallowed_link_dropped() {
    let root = tempfile::tempdir().unwrap();
    let corpus = r#"{"page_id": "P1", "sections": [{"text": "See A and B", "target_page_ids": ["P2", "P3"], "link_offsets": [4, 10], "link_lengths": [1, 1]}]}"#;
    let inputs = write_inputs(root.path(), FILTERED, PAGES, corpus);

    let entries = run_mode_a(&inputs, &output_dir(&root));

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text(), "See A and B");
    let links: Vec<_> = entries[0].links().iter().collect();
    assert_eq!(links.len(), 1);
    assert_eq!(*links[0].0, Span(4, 5));
    assert_eq!(links[0].1.get(&EntityId::from("Q2")), Some(&1.0));
}

#[test]
fn test_record_with_unknown_page_skipped() {
    let root = tempfile::tempdir().unwrap();
    let corpus = concat!(
        r#"{"page_id": "P9", "sections": [{"text": "lost", "target_page_ids": ["P2"], "link_offsets": [0], "link_lengths": [4]}]}"#,
        "\n",
        r#"{"page_id": "P2", "sections": [{"text": "kept", "target_page_ids": ["P1"], "link_offsets": [0], "link_lengths": [4]}]}"#,
        "\n"
    );
    let inputs = write_inputs(root.path(), FILTERED, PAGES, corpus);
    let out = output_dir(&root);

    let report = run(
        &inputs,
        &OutputTarget::Directory(out),
        &BuilderConfig::default(),
        |_| {},
    )
    .unwrap();

    assert_eq!(report.entries, 1);
    assert_eq!(report.stats.records_missing_page, 1);
    let entries = read_artifact(&report.artifact, ArtifactFormat::Bincode).unwrap();
    assert_eq!(entries[0].text(), "kept");
}

#[test]
fn test_record_with_disallowed_entity_skipped() {
    let root = tempfile::tempdir().unwrap();
    let corpus = r#"{"page_id": "P3", "sections": [{"text": "x", "target_page_ids": ["P1"], "link_offsets": [0], "link_lengths": [1]}]}"#;
    let inputs = write_inputs(root.path(), FILTERED, PAGES, corpus);

    let entries = run_mode_a(&inputs, &output_dir(&root));

    assert!(entries.is_empty());
}

#[test]
fn test_empty_corpus_writes_empty_list() {
    let root = tempfile::tempdir().unwrap();
    let inputs = write_inputs(root.path(), FILTERED, PAGES, "");

    let entries = run_mode_a(&inputs, &output_dir(&root));

    assert!(entries.is_empty());
}

#[test]
fn test_duplicate_span_keeps_later_link() {
    let root = tempfile::tempdir().unwrap();
    let corpus = r#"{"page_id": "P1", "sections": [{"text": "Alpha", "target_page_ids": ["P1", "P2"], "link_offsets": [0, 0], "link_lengths": [5, 5]}]}"#;
    let inputs = write_inputs(root.path(), FILTERED, PAGES, corpus);

    let entries = run_mode_a(&inputs, &output_dir(&root));

    let weights = entries[0].links().get(&Span(0, 5)).unwrap();
    assert_eq!(weights.len(), 1);
    assert!(weights.contains_key(&EntityId::from("Q2")));
}

#[test]
fn test_numeric_page_ids_join() {
    let root = tempfile::tempdir().unwrap();
    let pages = "page_id,item_id\n12,Q1\n13,Q2\n";
    let corpus = r#"{"page_id": 12, "sections": [{"text": "ab", "target_page_ids": [13], "link_offsets": [0], "link_lengths": [2]}]}"#;
    let inputs = write_inputs(root.path(), FILTERED, pages, corpus);

    let entries = run_mode_a(&inputs, &output_dir(&root));

    assert_eq!(entries.len(), 1);
    assert!(entries[0].links().get(&Span(0, 2)).is_some());
}

// =============================================================================
// Run-level behavior
// =============================================================================

#[test]
fn test_idempotent_output() {
    let root = tempfile::tempdir().unwrap();
    let corpus = concat!(
        r#"{"page_id": "P1", "sections": [{"text": "one two", "target_page_ids": ["P2", "P1"], "link_offsets": [4, 0], "link_lengths": [3, 3]}]}"#,
        "\n",
        r#"{"page_id": "P2", "sections": [{"text": "three", "target_page_ids": ["P1"], "link_offsets": [0], "link_lengths": [5]}]}"#,
        "\n"
    );
    let inputs = write_inputs(root.path(), FILTERED, PAGES, corpus);

    let first_dir = root.path().join("first");
    let second_dir = root.path().join("second");
    std::fs::create_dir(&first_dir).unwrap();
    std::fs::create_dir(&second_dir).unwrap();

    for dir in [&first_dir, &second_dir] {
        run(
            &inputs,
            &OutputTarget::Directory(dir.clone()),
            &BuilderConfig::default(),
            |_| {},
        )
        .unwrap();
    }

    let first = std::fs::read(first_dir.join("dataset.pkl")).unwrap();
    let second = std::fs::read(second_dir.join("dataset.pkl")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_mode_b_timestamped_with_serialized_set() {
    let root = tempfile::tempdir().unwrap();
    let mut inputs = write_inputs(
        root.path(),
        FILTERED,
        PAGES,
        r#"{"page_id": "P1", "sections": [{"text": "ab", "target_page_ids": ["P2"], "link_offsets": [0], "link_lengths": [1]}]}"#,
    );
    inputs.filtered_items = root.path().join("filtered_items.json");
    std::fs::write(&inputs.filtered_items, r#"["Q1", "Q2"]"#).unwrap();

    let mut config = BuilderConfig::default();
    config.output.format = ArtifactFormat::Json;
    let dataset_dir = root.path().join("data").join("dataset");

    let report = run(
        &inputs,
        &OutputTarget::Timestamped(dataset_dir.clone()),
        &config,
        |_| {},
    )
    .unwrap();

    assert_eq!(report.artifact.parent(), Some(dataset_dir.as_path()));
    let name = report.artifact.file_name().unwrap().to_str().unwrap();
    assert!(name.ends_with("_dataset.json"));
    let entries = read_artifact(&report.artifact, ArtifactFormat::Json).unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_progress_reports_every_chunk() {
    let root = tempfile::tempdir().unwrap();
    let line = r#"{"page_id": "P1", "sections": []}"#;
    let corpus: String = std::iter::repeat(format!("{line}\n")).take(5).collect();
    let inputs = write_inputs(root.path(), FILTERED, PAGES, &corpus);

    let mut config = BuilderConfig::default();
    config.input.chunk_size = 2;
    let mut seen = Vec::new();

    run(
        &inputs,
        &OutputTarget::Directory(output_dir(&root)),
        &config,
        |n| seen.push(n),
    )
    .unwrap();

    assert_eq!(seen, vec![2, 2, 1]);
}

#[test]
fn test_malformed_record_aborts_without_output() {
    let root = tempfile::tempdir().unwrap();
    let corpus = concat!(
        r#"{"page_id": "P1", "sections": []}"#,
        "\n",
        r#"{"page_id": "P1", "sections": [{"text": "no arrays"}]}"#,
        "\n"
    );
    let inputs = write_inputs(root.path(), FILTERED, PAGES, corpus);
    let out = output_dir(&root);

    let err = run(
        &inputs,
        &OutputTarget::Directory(out.clone()),
        &BuilderConfig::default(),
        |_| {},
    )
    .unwrap_err();

    assert!(matches!(err, LinkdsError::MalformedRecord { line: 2, .. }));
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn test_missing_corpus_is_io_error() {
    let root = tempfile::tempdir().unwrap();
    let mut inputs = write_inputs(root.path(), FILTERED, PAGES, "");
    inputs.link_annotations = root.path().join("missing.jsonl");

    let err = run(
        &inputs,
        &OutputTarget::Directory(output_dir(&root)),
        &BuilderConfig::default(),
        |_| {},
    )
    .unwrap_err();

    assert!(matches!(err, LinkdsError::Io { .. }));
}

// =============================================================================
// Properties
// =============================================================================

fn property_context() -> BuildContext {
    let allow_set: AllowSet = ["Q0", "Q1", "Q2"].into_iter().map(EntityId::from).collect();
    let page_map: PageMap = (0..6u64)
        .map(|n| (PageId::from(n), EntityId::new(format!("Q{n}"))))
        .collect();
    BuildContext::new(allow_set, page_map)
}

proptest! {
    #[test]
    fn prop_spans_match_offsets(
        links in proptest::collection::vec((0u64..8, 0u64..1000, 0u64..50), 0..20)
    ) {
        let ctx = property_context();
        let section = Section {
            text: "text".to_string(),
            target_page_ids: links.iter().map(|(p, _, _)| PageId::from(*p)).collect(),
            link_offsets: links.iter().map(|(_, o, _)| *o).collect(),
            link_lengths: links.iter().map(|(_, _, l)| *l).collect(),
        };
        let record = AnnotationRecord { page_id: PageId::from(0u64), sections: vec![section] };
        let mut stats = BuildStats::default();

        let entries = ctx.process_record(&record, &mut stats);

        let allowed: Vec<_> = links.iter().filter(|(p, _, _)| *p < 3).collect();
        prop_assert_eq!(entries.is_empty(), allowed.is_empty());

        for entry in &entries {
            for (span, weights) in entry.links().iter() {
                let (page, _, _) = allowed
                    .iter()
                    .rev()
                    .find(|(_, o, l)| Span::from_offset(*o, *l) == Some(*span))
                    .expect("span comes from an allowed link");
                let expected = EntityId::new(format!("Q{page}"));
                prop_assert_eq!(weights.get(&expected), Some(&1.0));
                prop_assert_eq!(weights.len(), 1);
            }
        }
    }
}
