//! Chunked reader for the link-annotated corpus
//!
//! The corpus is newline-delimited JSON with one [`AnnotationRecord`] per
//! line. Records are handed out in bounded chunks so that peak memory does
//! not grow with the corpus size.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use linkds_core::{AnnotationRecord, LinkdsError, Result};

/// Lazy, forward-only stream of record chunks
pub struct AnnotationStream<R> {
    reader: R,
    path: PathBuf,
    chunk_size: usize,
    line_no: usize,
    buf: String,
    done: bool,
}

impl AnnotationStream<BufReader<File>> {
    /// Open a corpus file
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LinkdsError::io(path, e))?;
        Ok(Self::new(BufReader::new(file), path, chunk_size))
    }
}

impl<R: BufRead> AnnotationStream<R> {
    /// Wrap any buffered reader; `path` is only used in error messages
    pub fn new(reader: R, path: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            reader,
            path: path.into(),
            chunk_size: chunk_size.max(1),
            line_no: 0,
            buf: String::new(),
            done: false,
        }
    }

    /// 1-based number of the last line read
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    fn malformed(&self, message: String) -> LinkdsError {
        LinkdsError::MalformedRecord {
            path: self.path.clone(),
            line: self.line_no,
            message,
        }
    }

    fn next_record(&mut self) -> Result<Option<AnnotationRecord>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_line(&mut self.buf)
                .map_err(|e| LinkdsError::io(&self.path, e))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }

            let record: AnnotationRecord =
                serde_json::from_str(line).map_err(|e| self.malformed(e.to_string()))?;

            if let Some(index) = record
                .sections
                .iter()
                .position(|section| section.link_count().is_none())
            {
                return Err(self.malformed(format!(
                    "section {index} has link arrays of unequal length"
                )));
            }
            for (index, section) in record.sections.iter().enumerate() {
                if let Some(link) = section.overflowing_link() {
                    return Err(self.malformed(format!(
                        "section {index} link {link} ends past the largest offset"
                    )));
                }
            }
            return Ok(Some(record));
        }
    }

    fn next_chunk(&mut self) -> Result<Vec<AnnotationRecord>> {
        let mut chunk = Vec::with_capacity(self.chunk_size);
        while chunk.len() < self.chunk_size {
            match self.next_record()? {
                Some(record) => chunk.push(record),
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        Ok(chunk)
    }
}

impl<R: BufRead> Iterator for AnnotationStream<R> {
    type Item = Result<Vec<AnnotationRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_chunk() {
            Ok(chunk) if chunk.is_empty() => None,
            Ok(chunk) => {
                debug!(
                    "Read chunk of {} records (through line {})",
                    chunk.len(),
                    self.line_no
                );
                Some(Ok(chunk))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Count the non-blank lines (records) of a corpus file
pub fn count_records(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| LinkdsError::io(path, e))?;

    let mut count = 0u64;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| LinkdsError::io(path, e))?;
        if !line.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}
