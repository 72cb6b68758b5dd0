//! NDJSON export of a transformed batch.
//!
//! Used by dry runs: every row that would be written to the warehouse is
//! emitted as one JSON object per line, tagged with its target table.

use serde::Serialize;
use std::io::Write;

use crate::entity::{Entity, FactSalesRow};
use crate::pipeline::{RunId, TransformedBatch};

/// Error type for serialization operations
#[derive(Debug)]
pub enum SerializationError {
    JsonError(serde_json::Error),
    IoError(std::io::Error),
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        SerializationError::JsonError(err)
    }
}

impl From<std::io::Error> for SerializationError {
    fn from(err: std::io::Error) -> Self {
        SerializationError::IoError(err)
    }
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationError::JsonError(e) => write!(f, "JSON error: {}", e),
            SerializationError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for SerializationError {}

/// NDJSON (Newline Delimited JSON) writer
pub struct NdjsonWriter<W: Write> {
    writer: W,
    lines: usize,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    /// Write a single value as an NDJSON line
    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<(), SerializationError> {
        let json = serde_json::to_string(value)?;
        writeln!(self.writer, "{}", json)?;
        self.lines += 1;
        Ok(())
    }

    /// Write every record of one table, each wrapped in an `ExportLine`.
    pub fn write_table<T: Entity>(
        &mut self,
        run_id: RunId,
        table: &'static str,
        records: &[T],
    ) -> Result<(), SerializationError> {
        for row in records {
            self.write(&ExportLine { run_id, table, row })?;
        }
        Ok(())
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<(), SerializationError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One exported row.
#[derive(Debug, Serialize)]
pub struct ExportLine<'a, T: Serialize> {
    pub run_id: RunId,
    pub table: &'static str,
    pub row: &'a T,
}

/// Export a batch in load order: dimensions first, then facts.
pub fn export_batch<W: Write>(
    writer: W,
    batch: &TransformedBatch,
    facts: &[FactSalesRow],
) -> Result<usize, SerializationError> {
    let mut out = NdjsonWriter::new(writer);
    out.write_table(batch.run_id, "dim_customer", &batch.customers)?;
    out.write_table(batch.run_id, "dim_product", &batch.products)?;
    out.write_table(batch.run_id, "dim_date", &batch.dates)?;
    out.write_table(batch.run_id, "fact_sales", facts)?;
    out.flush()?;
    Ok(out.lines())
}
