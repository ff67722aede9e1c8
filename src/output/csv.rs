//! `;`-delimited CSV writer for [`Table`]s
//!
//! Files start with a UTF-8 byte order mark so spreadsheet tools pick the
//! right encoding for accented names. The header is the table's column list;
//! missing and null cells are written empty.

use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult};
use crate::table::{cell_to_string, Record, Table};

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Field delimiter
pub const DELIMITER: u8 = b';';

/// UTF-8 byte order mark
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Streaming writer for rows sharing a fixed column list
pub struct CsvTableWriter {
    writer: Writer<BufWriter<File>>,
    columns: Vec<String>,
    rows_written: u64,
}

impl CsvTableWriter {
    /// Create `path` (and its parent directory) and write BOM plus header
    pub fn create<P: AsRef<Path>>(path: P, columns: &[String]) -> OutputResult<Self> {
        let path = path.as_ref();
        debug!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        let mut buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        buf_writer
            .write_all(UTF8_BOM)
            .map_err(|e| OutputError::IoError(format!("Failed to write BOM: {}", e)))?;

        let mut writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_writer(buf_writer);

        writer
            .write_record(columns)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;

        Ok(Self {
            writer,
            columns: columns.to_vec(),
            rows_written: 0,
        })
    }

    /// Write one record in column order
    pub fn write_row(&mut self, record: &Record) -> OutputResult<()> {
        let cells = self
            .columns
            .iter()
            .map(|column| record.get(column).map(cell_to_string).unwrap_or_default());

        self.writer
            .write_record(cells)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;

        self.rows_written += 1;
        Ok(())
    }

    /// Rows written so far (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush buffered data to disk
    pub fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    /// Flush, sync and close the file
    pub fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {}", e)))?;

        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {}", e)))?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        Ok(())
    }
}

/// Write `table` to `path`, replacing any existing file
pub fn write_table<P: AsRef<Path>>(path: P, table: &Table) -> OutputResult<u64> {
    let path = path.as_ref();
    let mut writer = CsvTableWriter::create(path, table.columns())?;
    for row in table.rows() {
        writer.write_row(row)?;
    }
    let rows = writer.rows_written();
    writer.close()?;

    info!("Wrote {} rows to {}", rows, path.display());
    Ok(rows)
}
