//! Table file header.
//!
//! ```text
//! offset 0   magic      3 bytes  "rfk"
//! offset 3   version    1 byte
//! offset 4   num_rows   u32 BE
//! offset 8   num_cols   u32 BE
//! offset 12  columns    num_cols x [name_len: u16 BE | name bytes | type tag: u8]
//! ```
//!
//! Rows follow immediately after the last column definition.

use std::collections::TryReserveError;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tracing::debug;

use crate::growth::push_doubling;
use crate::schema::{Column, DataType};
use crate::{HEADER_PREFIX_SIZE, MAGIC, MAX_NUM_CELLS, ROW_COUNT_OFFSET, VERSION};

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("a header needs at least one column")]
    InvalidColumns,
    #[error("invalid header: {0}")]
    InvalidArgument(String),
    #[error("failed to write header")]
    Write(#[source] io::Error),
    #[error("failed to read header")]
    Read(#[source] io::Error),
    #[error("failed to allocate header columns")]
    MemoryAllocation(#[from] TryReserveError),
    #[error("failed to update row count")]
    Update(#[source] io::Error),
}

fn corrupt(message: String) -> HeaderError {
    HeaderError::Read(io::Error::new(io::ErrorKind::InvalidData, message))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    magic: [u8; 3],
    version: u8,
    num_rows: u32,
    columns: Vec<Column>,
}

impl Header {
    /// Creates the header for a new, empty table.
    pub fn new(columns: Vec<Column>) -> Result<Self, HeaderError> {
        if columns.is_empty() {
            return Err(HeaderError::InvalidColumns);
        }
        Ok(Header {
            magic: MAGIC,
            version: VERSION,
            num_rows: 0,
            columns,
        })
    }

    pub fn magic(&self) -> [u8; 3] {
        self.magic
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn num_rows(&self) -> u32 {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Size of the encoded header in bytes, which is also the offset of the
    /// first row.
    pub fn encoded_len(&self) -> usize {
        HEADER_PREFIX_SIZE
            + self
                .columns
                .iter()
                .map(|column| 2 + column.name().len() + 1)
                .sum::<usize>()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), HeaderError> {
        let num_cols = u32::try_from(self.columns.len()).map_err(|_| {
            HeaderError::InvalidArgument(format!("{} columns do not fit in u32", self.columns.len()))
        })?;

        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_slice(&self.magic);
        buf.put_u8(self.version);
        buf.put_u32(self.num_rows);
        buf.put_u32(num_cols);

        for column in &self.columns {
            let name = column.name().as_bytes();
            let name_len = u16::try_from(name.len()).map_err(|_| {
                HeaderError::InvalidArgument(format!("column name of {} bytes is too long", name.len()))
            })?;
            buf.put_u16(name_len);
            buf.put_slice(name);
            buf.put_u8(column.data_type().tag());
        }

        w.write_all(&buf).map_err(HeaderError::Write)
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, HeaderError> {
        let mut prefix = [0u8; HEADER_PREFIX_SIZE];
        r.read_exact(&mut prefix).map_err(HeaderError::Read)?;
        let mut buf = &prefix[..];

        let mut magic = [0u8; 3];
        buf.copy_to_slice(&mut magic);
        if magic != MAGIC {
            return Err(corrupt(format!("invalid magic: {magic:02x?}")));
        }

        let version = buf.get_u8();
        if version != VERSION {
            return Err(corrupt(format!("unsupported version: {version}")));
        }

        let num_rows = buf.get_u32();
        let num_cols = buf.get_u32() as usize;
        if num_cols == 0 {
            return Err(HeaderError::InvalidColumns);
        }

        // The count is untrusted; reserve at most a row's worth up front.
        let mut columns = Vec::new();
        columns.try_reserve_exact(num_cols.min(MAX_NUM_CELLS))?;
        for _ in 0..num_cols {
            push_doubling(&mut columns, read_column(r)?)?;
        }

        Ok(Header {
            magic,
            version,
            num_rows,
            columns,
        })
    }

    /// Rewrites the on-disk row count as `num_rows + increment`, then bumps
    /// the in-memory count.
    ///
    /// The stream cursor is restored to where it was before the call. On
    /// failure the in-memory header is left as it was, but the cursor and
    /// the on-disk count may not be.
    pub fn update_row_count<S: Write + Seek>(
        &mut self,
        stream: &mut S,
        increment: u32,
    ) -> Result<(), HeaderError> {
        let updated = self.num_rows.checked_add(increment).ok_or_else(|| {
            HeaderError::Update(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("row count {} + {increment} overflows u32", self.num_rows),
            ))
        })?;

        let position = stream.stream_position().map_err(HeaderError::Update)?;
        stream
            .seek(SeekFrom::Start(ROW_COUNT_OFFSET))
            .map_err(HeaderError::Update)?;
        stream
            .write_all(&updated.to_be_bytes())
            .map_err(HeaderError::Update)?;
        stream
            .seek(SeekFrom::Start(position))
            .map_err(HeaderError::Update)?;

        debug!(from = self.num_rows, to = updated, "updated row count");
        self.num_rows = updated;
        Ok(())
    }
}

fn read_column<R: Read>(r: &mut R) -> Result<Column, HeaderError> {
    let mut len = [0u8; 2];
    r.read_exact(&mut len).map_err(HeaderError::Read)?;
    let name_len = u16::from_be_bytes(len) as usize;

    let mut name = Vec::new();
    name.try_reserve_exact(name_len)?;
    name.resize(name_len, 0);
    r.read_exact(&mut name).map_err(HeaderError::Read)?;
    let name = String::from_utf8(name)
        .map_err(|e| HeaderError::Read(io::Error::new(io::ErrorKind::InvalidData, e)))?;

    let mut tag = [0u8; 1];
    r.read_exact(&mut tag).map_err(HeaderError::Read)?;
    let data_type = DataType::from_tag(tag[0])
        .ok_or_else(|| corrupt(format!("unknown data type tag {} for column {name}", tag[0])))?;

    Ok(Column::from_parts(name, data_type))
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "magic: {}", String::from_utf8_lossy(&self.magic))?;
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "number of rows: {}", self.num_rows)?;
        write!(f, "number of columns: {}", self.columns.len())?;
        for column in &self.columns {
            write!(f, "\n  {}: {}", column.name(), column.data_type())?;
        }
        Ok(())
    }
}
