use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::error::{CldfError, Result};
use crate::schema::Table;

use super::codec::CellCodec;
use super::dialect::Dialect;
use super::row::Row;

/// Write `rows` to `path` in the column order of `table`.
///
/// Cells for names the schema does not know are not written. Returns the
/// number of rows written.
pub fn write_rows<'a>(
    path: &Path,
    table: &Table,
    dialect: &Dialect,
    rows: impl IntoIterator<Item = &'a Row>,
) -> Result<usize> {
    let codecs = table
        .columns()
        .iter()
        .map(CellCodec::new)
        .collect::<Result<Vec<_>>>()?;
    let file = File::create(path).map_err(|e| CldfError::io(path, e))?;
    let mut writer = dialect.writer_builder()?.from_writer(file);

    if dialect.header {
        writer.write_record(table.column_names())?;
    }
    let mut count = 0;
    for row in rows {
        let record = table
            .columns()
            .iter()
            .zip(&codecs)
            .map(|(col, codec)| codec.write(row.get(&col.name)))
            .collect::<Result<Vec<_>>>()?;
        writer.write_record(&record)?;
        count += 1;
    }
    writer.flush().map_err(|e| CldfError::io(path, e))?;
    info!(path = %path.display(), rows = count, "wrote table");
    Ok(count)
}
