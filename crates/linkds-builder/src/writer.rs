//! Dataset artifact writer
//!
//! Serializes the finished dataset to a single file. The artifact is written
//! to a temporary file next to its destination and renamed into place only
//! once complete, so an interrupted run leaves nothing behind.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use linkds_core::{ArtifactFormat, DatasetEntry, LinkdsError, Result};

/// Base name of every artifact
pub const ARTIFACT_STEM: &str = "dataset";

/// Where the artifact goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// `<dir>/dataset.<ext>`; the directory must already exist
    Directory(PathBuf),
    /// `<dir>/<timestamp>_dataset.<ext>`; the directory is created if needed
    /// and an existing artifact is never replaced
    Timestamped(PathBuf),
}

impl OutputTarget {
    /// Final artifact path for `format`, stamping with `now` when timestamped
    pub fn artifact_path(&self, format: ArtifactFormat, now: DateTime<Local>) -> PathBuf {
        match self {
            Self::Directory(dir) => {
                dir.join(format!("{ARTIFACT_STEM}.{}", format.extension()))
            }
            Self::Timestamped(dir) => dir.join(format!(
                "{}_{ARTIFACT_STEM}.{}",
                now.format("%Y-%m-%dT%H-%M-%S%.6f"),
                format.extension()
            )),
        }
    }

    fn dir(&self) -> &Path {
        match self {
            Self::Directory(dir) | Self::Timestamped(dir) => dir,
        }
    }
}

/// Serialize `entries` to `target`, returning the written path
pub fn write_artifact(
    entries: &[DatasetEntry],
    target: &OutputTarget,
    format: ArtifactFormat,
) -> Result<PathBuf> {
    write_artifact_at(entries, target, format, Local::now())
}

fn write_artifact_at(
    entries: &[DatasetEntry],
    target: &OutputTarget,
    format: ArtifactFormat,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    if let OutputTarget::Timestamped(dir) = target {
        std::fs::create_dir_all(dir).map_err(|e| LinkdsError::io(dir, e))?;
    }

    let path = target.artifact_path(format, now);
    info!("Saving generated dataset to {}", path.display());

    let dir = target.dir();
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| LinkdsError::io(dir, e))?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        encode(entries, format, &mut out)?;
        out.flush().map_err(|e| LinkdsError::io(tmp.path(), e))?;
    }
    let persisted = match target {
        OutputTarget::Directory(_) => tmp.persist(&path),
        OutputTarget::Timestamped(_) => tmp.persist_noclobber(&path),
    };
    persisted.map_err(|e| LinkdsError::io(&path, e.error))?;

    info!("Wrote {} entries to {}", entries.len(), path.display());
    Ok(path)
}

/// Encode `entries` into any writer
pub fn encode<W: Write>(entries: &[DatasetEntry], format: ArtifactFormat, out: W) -> Result<()> {
    match format {
        ArtifactFormat::Bincode => bincode::serialize_into(out, entries)
            .map_err(|e| LinkdsError::Serialization(e.to_string())),
        ArtifactFormat::Json => serde_json::to_writer(out, entries)
            .map_err(|e| LinkdsError::Serialization(e.to_string())),
    }
}

/// Load an artifact written by [`write_artifact`]
pub fn read_artifact(path: &Path, format: ArtifactFormat) -> Result<Vec<DatasetEntry>> {
    let file = File::open(path).map_err(|e| LinkdsError::io(path, e))?;
    let reader = BufReader::new(file);

    match format {
        ArtifactFormat::Bincode => bincode::deserialize_from(reader)
            .map_err(|e| LinkdsError::Serialization(format!("{}: {e}", path.display()))),
        ArtifactFormat::Json => serde_json::from_reader(reader)
            .map_err(|e| LinkdsError::Serialization(format!("{}: {e}", path.display()))),
    }
}
