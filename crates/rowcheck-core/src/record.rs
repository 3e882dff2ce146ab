//! Record decoding for delimited input streams.
//!
//! A [`RecordSource`] turns a byte stream into a lazy, forward-only sequence
//! of [`Record`]s by splitting each line on a fixed delimiter. Splitting is
//! purely syntactic: fields are not trimmed, coerced, or reordered. Sources
//! are not restartable; re-scanning an input requires a new source.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur while reading records from a stream.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error while reading input: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: record is not valid UTF-8")]
    NotText { line: u64 },
}

/// One decoded line of delimited input.
///
/// Fields are 0-indexed and positional; there is no header row. The record
/// remembers its 1-based input line number for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
    line: u64,
}

impl Record {
    /// Build a record from already-split fields.
    pub fn new(fields: Vec<String>, line: u64) -> Self {
        Self { fields, line }
    }

    /// Split one line of text on `delimiter`.
    pub fn from_line(text: &str, delimiter: char, line: u64) -> Self {
        Self {
            fields: text.split(delimiter).map(str::to_string).collect(),
            line,
        }
    }

    /// The field at `index`, if the record is wide enough.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Number of fields in this record.
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// 1-based line number this record was decoded from.
    pub fn line(&self) -> u64 {
        self.line
    }
}

/// A lazy, finite, forward-only source of records.
///
/// Reads one line at a time, so memory use is bounded by the longest record
/// regardless of input size. When built with [`RecordSource::open`], the
/// underlying file handle is scoped to the source and released when the
/// source is dropped, on every exit path.
pub struct RecordSource<R> {
    reader: R,
    delimiter: char,
    line: u64,
    buf: String,
}

impl RecordSource<BufReader<File>> {
    /// Open a file-backed source.
    pub fn open(path: impl AsRef<Path>, delimiter: char) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), delimiter))
    }
}

impl<R: BufRead> RecordSource<R> {
    /// Wrap any buffered reader.
    pub fn new(reader: R, delimiter: char) -> Self {
        Self {
            reader,
            delimiter,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for RecordSource<R> {
    type Item = Result<Record, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            self.line += 1;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let text = self.buf.trim_end_matches(['\n', '\r']);
                    // Blank lines carry no record.
                    if text.is_empty() {
                        continue;
                    }
                    return Some(Ok(Record::from_line(text, self.delimiter, self.line)));
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    return Some(Err(SourceError::NotText { line: self.line }));
                }
                Err(e) => return Some(Err(SourceError::Io(e))),
            }
        }
    }
}
