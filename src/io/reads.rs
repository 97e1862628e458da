//! # Training Read Sources
//!
//! A training read is the sequence of (move, k-mer) pairs a basecaller
//! assigned to one signal trace. Sources yield reads one at a time until
//! exhausted; `Ok(None)` is the end-of-stream contract.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info_span;

use crate::error::{PorepathError, Result};

/// One basecaller step: the number of bases advanced since the previous
/// k-mer, and the k-mer called at this position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveKmer {
    #[serde(rename = "move")]
    pub mv: usize,
    pub kmer: String,
}

/// Source of annotated training reads for the move-model builder.
pub trait ReadSource {
    /// Next read, or `Ok(None)` once the source is exhausted.
    fn next_read(&mut self) -> Result<Option<Vec<MoveKmer>>>;
}

/// In-memory read source.
pub struct VecReads {
    reads: std::vec::IntoIter<Vec<MoveKmer>>,
}

impl VecReads {
    pub fn new(reads: Vec<Vec<MoveKmer>>) -> Self {
        Self {
            reads: reads.into_iter(),
        }
    }
}

impl ReadSource for VecReads {
    fn next_read(&mut self) -> Result<Option<Vec<MoveKmer>>> {
        Ok(self.reads.next())
    }
}

/// File-backed read source: one JSON array of `{move, kmer}` objects per
/// line. Blank lines are skipped; parse failures carry the line number.
pub struct JsonlReads<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl JsonlReads<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info_span!("reads_open", path = ?path).in_scope(|| {
            let file = File::open(path)?;
            Ok(Self::new(BufReader::new(file)))
        })
    }
}

impl<R: BufRead> JsonlReads<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> ReadSource for JsonlReads<R> {
    fn next_read(&mut self) -> Result<Option<Vec<MoveKmer>>> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            let line = line?;
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let read: Vec<MoveKmer> = serde_json::from_str(&line).map_err(|err| {
                PorepathError::deserialization(format!("read line {}: {err}", self.line_no))
            })?;
            return Ok(Some(read));
        }
    }
}
