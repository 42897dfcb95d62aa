use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::file::{create_file, open_file, FileError};
use crate::growth::push_doubling;
use crate::header::{Header, HeaderError};
use crate::row::{parse_row, Row, RowError};
use crate::schema::{parse_schema, SchemaError};

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    File(#[from] FileError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error(transparent)]
    Row(#[from] RowError),
    #[error("failed to seek in table file")]
    Seek(#[source] io::Error),
}

/// An open table file: the decoded header plus the handle rows are
/// appended to and read from.
///
/// Appending is not atomic. The row bytes are written first and the header
/// row count second, so a failure in between leaves an uncounted row past
/// the last counted one. Until the next append it is invisible. A later
/// append writes after it and bumps the count, so scanning then returns the
/// uncounted row in the new row's place and the newest row falls outside
/// the counted range.
pub struct Table {
    file: File,
    path: PathBuf,
    header: Header,
    data_offset: u64,
}

impl Table {
    /// Creates a new table file at `path` with the columns described by
    /// `schema`. The schema is parsed before the file is touched.
    pub fn create<P: AsRef<Path>>(path: P, schema: &str) -> Result<Self, TableError> {
        let path = path.as_ref();
        let header = Header::new(parse_schema(schema)?)?;

        let mut file = create_file(path)?;
        header.write_to(&mut file)?;
        debug!(path = %path.display(), columns = header.num_cols(), "created table");

        Ok(Table {
            file,
            path: path.to_path_buf(),
            data_offset: header.encoded_len() as u64,
            header,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let file = open_file(path)?;
        let header = Header::read_from(&mut BufReader::new(&file))?;
        debug!(
            path = %path.display(),
            rows = header.num_rows(),
            columns = header.num_cols(),
            "opened table"
        );

        Ok(Table {
            file,
            path: path.to_path_buf(),
            data_offset: header.encoded_len() as u64,
            header,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn row_count(&self) -> u32 {
        self.header.num_rows()
    }

    /// Parses `text` as a row literal and appends it.
    pub fn append(&mut self, text: &str) -> Result<Row, TableError> {
        let row = parse_row(&self.header, text)?;
        self.append_row(&row)?;
        Ok(row)
    }

    pub fn append_row(&mut self, row: &Row) -> Result<(), TableError> {
        if !row.conforms_to(&self.header) {
            return Err(RowError::InvalidArgument(format!(
                "row [{row}] does not match the table's {} columns",
                self.header.num_cols()
            ))
            .into());
        }

        self.file.seek(SeekFrom::End(0)).map_err(TableError::Seek)?;
        row.write_to(&mut self.file)?;
        self.header.update_row_count(&mut self.file, 1)?;
        debug!(path = %self.path.display(), rows = self.header.num_rows(), "appended row");
        Ok(())
    }

    /// Reads every counted row, in append order.
    pub fn rows(&mut self) -> Result<Vec<Row>, TableError> {
        self.file
            .seek(SeekFrom::Start(self.data_offset))
            .map_err(TableError::Seek)?;
        let mut reader = BufReader::new(&self.file);

        // The count comes from disk; grow as rows are actually decoded.
        let mut rows = Vec::new();
        for index in 0..self.header.num_rows() {
            let row = Row::read_from(&mut reader, &self.header)?;
            if !row.conforms_to(&self.header) {
                warn!(index, row = %row, "row cell types do not match the header");
            }
            push_doubling(&mut rows, row).map_err(RowError::from)?;
        }

        debug!(path = %self.path.display(), rows = rows.len(), "read rows");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Cell;
    use bytes::Bytes;
    use tempfile::tempdir;

    const SCHEMA: &str = "(age:int name:string score:float)";

    #[test]
    fn create_append_and_reopen() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("people.rfk");

        let mut table = Table::create(&path, SCHEMA)?;
        assert_eq!(table.row_count(), 0);
        table.append("(30 && Alice && 95.5)")?;
        table.append("(41 && Bob && 70.25)")?;
        assert_eq!(table.row_count(), 2);
        drop(table);

        let mut reopened = Table::open(&path)?;
        assert_eq!(reopened.row_count(), 2);
        assert_eq!(reopened.header().num_cols(), 3);

        let rows = reopened.rows()?;
        assert_eq!(
            rows[0].cells(),
            &[
                Cell::Int(30),
                Cell::String(Bytes::from_static(b"Alice")),
                Cell::Float(95.5),
            ]
        );
        assert_eq!(rows[1].to_string(), "41|Bob|70.25");
        Ok(())
    }

    #[test]
    fn appends_after_reopen_keep_order() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.rfk");
        Table::create(&path, "(n:int)")?.append("(1)")?;

        let mut table = Table::open(&path)?;
        table.append("(2)")?;
        table.append("(3)")?;

        let values: Vec<String> = table.rows()?.iter().map(|r| r.to_string()).collect();
        assert_eq!(values, vec!["1", "2", "3"]);
        Ok(())
    }

    #[test]
    fn rejected_row_leaves_file_untouched() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("people.rfk");
        let mut table = Table::create(&path, SCHEMA)?;
        let len_before = std::fs::metadata(&path)?.len();

        let err = table.append("(abc && Alice && 95.5)").unwrap_err();
        assert!(matches!(
            err,
            TableError::Row(RowError::ColumnDataTypeCellValueMismatch { .. })
        ));
        assert_eq!(table.row_count(), 0);
        assert_eq!(std::fs::metadata(&path)?.len(), len_before);
        Ok(())
    }

    #[test]
    fn append_row_checks_types() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut table = Table::create(dir.path().join("t.rfk"), "(n:int)")?;
        let err = table
            .append_row(&Row::new(vec![Cell::Float(1.0)]))
            .unwrap_err();
        assert!(matches!(err, TableError::Row(RowError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn bad_schema_creates_no_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.rfk");
        let err = Table::create(&path, "(1bad:int)").err().unwrap();
        assert!(matches!(err, TableError::Schema(SchemaError::InvalidArgument { .. })));
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn create_refuses_existing_path() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.rfk");
        Table::create(&path, "(n:int)")?;
        let err = Table::create(&path, "(n:int)").err().unwrap();
        assert!(matches!(err, TableError::File(FileError::AlreadyExists(_))));
        Ok(())
    }

    #[test]
    fn open_rejects_foreign_files() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("not-a-table");
        std::fs::write(&path, b"hello world, not a table")?;
        let err = Table::open(&path).err().unwrap();
        assert!(matches!(err, TableError::Header(HeaderError::Read(_))));
        Ok(())
    }

    #[test]
    fn uncounted_tail_displaces_later_appends() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.rfk");
        let mut table = Table::create(&path, "(n:int)")?;
        table.append("(5)")?;
        drop(table);

        // A crash between writing row bytes and updating the count.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path)?;
        Row::new(vec![Cell::Int(6)]).write_to(&mut file)?;
        drop(file);

        let mut table = Table::open(&path)?;
        assert_eq!(table.row_count(), 1);
        let rows = table.rows()?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells(), &[Cell::Int(5)]);

        table.append("(7)")?;
        assert_eq!(table.row_count(), 2);
        let values: Vec<String> = table.rows()?.iter().map(|r| r.to_string()).collect();
        assert_eq!(values, vec!["5", "6"]);
        Ok(())
    }

    #[test]
    fn corrupt_row_count_is_an_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.rfk");
        Table::create(&path, "(n:int)")?.append("(5)")?;

        let mut bytes = std::fs::read(&path)?;
        bytes[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
        std::fs::write(&path, &bytes)?;

        let mut table = Table::open(&path)?;
        assert_eq!(table.row_count(), u32::MAX);
        let err = table.rows().unwrap_err();
        assert!(matches!(err, TableError::Row(RowError::Read(_))));
        Ok(())
    }
}
