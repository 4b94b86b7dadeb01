//! Row I/O: reading and writing the table files of a dataset.

mod codec;
mod dialect;
mod reader;
mod row;
mod writer;

pub use codec::{CellCodec, marshal, unmarshal};
pub use dialect::Dialect;
pub use reader::{RawRecord, RecordReader, Rows, archive_path, table_exists, table_path};
pub use row::Row;
pub use writer::write_rows;
