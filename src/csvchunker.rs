use std::fs::File;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};

use crate::errors::Result;

/// Streams a delimited file as bounded batches of records, in file order.
/// One forward pass over the file; reopen to restart.
pub struct CsvChunkReader {
    reader: Reader<File>,
    headers: StringRecord,
    chunk_rows: usize,
}

impl CsvChunkReader {
    pub fn open(path: &Path, chunk_rows: usize) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);
        let headers = reader.headers()?.clone();

        Ok(Self {
            reader,
            headers,
            chunk_rows,
        })
    }

    /// The header row, available before any chunk is read so callers can
    /// validate required columns up front.
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Next batch of at most `chunk_rows` records; None at end of file.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<StringRecord>>> {
        let mut chunk = Vec::with_capacity(self.chunk_rows);
        let mut record = StringRecord::new();

        while chunk.len() < self.chunk_rows {
            if !self.reader.read_record(&mut record)? {
                break;
            }
            chunk.push(record.clone());
        }

        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }
}
