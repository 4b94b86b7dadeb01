//! Streaming access to table files, loose or zipped.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CldfError, Result, ValidationFailure};
use crate::schema::Table;

use super::codec::CellCodec;
use super::dialect::Dialect;
use super::row::Row;

/// The undecoded cells of one line of a table file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Line number in the file; the header is line 1.
    pub line: usize,
    pub cells: Vec<String>,
}

/// Path of the file backing a table.
pub fn table_path(dir: &Path, table: &Table) -> PathBuf {
    dir.join(&table.url)
}

/// Path of the archive that may stand in for a missing table file.
pub fn archive_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".zip");
    PathBuf::from(name)
}

/// Whether the table has a file (or archive) to read from.
pub fn table_exists(dir: &Path, table: &Table) -> bool {
    let path = table_path(dir, table);
    path.exists() || archive_path(&path).exists()
}

fn open_source(path: &Path) -> Result<Option<Box<dyn Read>>> {
    if path.exists() {
        let file = File::open(path).map_err(|e| CldfError::io(path, e))?;
        return Ok(Some(Box::new(file)));
    }
    let zipped = archive_path(path);
    if !zipped.exists() {
        return Ok(None);
    }
    debug!(archive = %zipped.display(), "reading zipped table");
    let file = File::open(&zipped).map_err(|e| CldfError::io(&zipped, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let entry_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut entry = archive.by_name(&entry_name)?;
    let mut buffer = Vec::new();
    entry
        .read_to_end(&mut buffer)
        .map_err(|e| CldfError::io(&zipped, e))?;
    Ok(Some(Box::new(Cursor::new(buffer))))
}

/// Iterator over the records of a table file, header excluded.
pub struct RecordReader {
    path: PathBuf,
    header: Vec<String>,
    records: csv::StringRecordsIntoIter<Box<dyn Read>>,
    line: usize,
}

impl std::fmt::Debug for RecordReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReader")
            .field("path", &self.path)
            .field("header", &self.header)
            .finish()
    }
}

impl RecordReader {
    /// Open the file backing `table`, falling back to `<url>.zip`.
    ///
    /// Returns `Ok(None)` when neither exists. Without a header row in the
    /// dialect, the schema's column names serve as header.
    pub fn open(dir: &Path, table: &Table, dialect: &Dialect) -> Result<Option<Self>> {
        let path = table_path(dir, table);
        let Some(source) = open_source(&path)? else {
            return Ok(None);
        };
        let mut records = dialect.reader_builder()?.from_reader(source).into_records();
        let mut line = 0;
        let header = if dialect.header {
            match records.next() {
                Some(record) => {
                    let record = record?;
                    line = record_line(&record, 1);
                    record.iter().map(str::to_string).collect()
                }
                None => Vec::new(),
            }
        } else {
            table.column_names().into_iter().map(str::to_string).collect()
        };
        Ok(Some(Self {
            path,
            header,
            records,
            line,
        }))
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn record_line(record: &csv::StringRecord, fallback: usize) -> usize {
    record
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(fallback)
}

impl Iterator for RecordReader {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        self.line = record_line(&record, self.line + 1);
        Some(Ok(RawRecord {
            line: self.line,
            cells: record.iter().map(str::to_string).collect(),
        }))
    }
}

/// Lazy iterator of typed rows.
///
/// Each call to [`Rows::open`] reads the file anew, so iterating twice
/// reflects the file content at the time of each iteration.
#[derive(Debug)]
pub struct Rows {
    url: String,
    reader: Option<RecordReader>,
    /// Per schema column: name, codec and position in the header.
    columns: Vec<(String, CellCodec, Option<usize>)>,
    /// Header positions of cells the schema does not describe.
    extra: Vec<(String, usize)>,
}

impl Rows {
    /// Open the rows of `table`. A table without a file has no rows.
    pub fn open(dir: &Path, table: &Table, dialect: &Dialect) -> Result<Self> {
        let reader = RecordReader::open(dir, table, dialect)?;
        let header: &[String] = reader.as_ref().map(|r| r.header()).unwrap_or(&[]);
        let columns = table
            .columns()
            .iter()
            .map(|col| {
                let position = header.iter().position(|h| *h == col.name);
                Ok((col.name.clone(), CellCodec::new(col)?, position))
            })
            .collect::<Result<Vec<_>>>()?;
        let extra = header
            .iter()
            .enumerate()
            .filter(|(_, h)| table.columns().iter().all(|c| c.name != **h))
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Ok(Self {
            url: table.url.clone(),
            reader,
            columns,
            extra,
        })
    }

    fn decode(&self, record: RawRecord) -> Result<Row> {
        let mut row = Row::new();
        for (name, codec, position) in &self.columns {
            let text = position
                .and_then(|i| record.cells.get(i))
                .map(String::as_str)
                .unwrap_or("");
            let value = codec.read(text).map_err(|e| {
                CldfError::Validation(ValidationFailure {
                    table: Some(self.url.clone()),
                    column: Some(name.clone()),
                    line: Some(record.line),
                    message: e.to_string(),
                })
            })?;
            row.set(name.clone(), value);
        }
        for (name, i) in &self.extra {
            let value = record
                .cells
                .get(*i)
                .filter(|s| !s.is_empty())
                .map(|s| s.as_str().into());
            row.set(name.clone(), value);
        }
        Ok(row)
    }
}

impl Iterator for Rows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.reader.as_mut()?.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e)),
        };
        Some(self.decode(record))
    }
}
