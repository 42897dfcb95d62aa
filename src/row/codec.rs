use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use super::{Cell, Row, RowError};
use crate::header::Header;
use crate::schema::DataType;

impl Row {
    /// Size of the encoded row in bytes.
    pub fn encoded_len(&self) -> usize {
        self.cells()
            .iter()
            .map(|cell| match cell {
                Cell::Int(_) | Cell::Float(_) => 1 + 4,
                Cell::String(s) => 1 + 4 + s.len(),
            })
            .sum()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), RowError> {
        if self.is_empty() {
            return Err(RowError::InvalidCells);
        }

        let mut buf = BytesMut::with_capacity(self.encoded_len());
        for cell in self.cells() {
            buf.put_u8(cell.data_type().tag());
            match cell {
                Cell::Int(value) => buf.put_i32(*value),
                Cell::Float(value) => buf.put_u32(value.to_bits()),
                Cell::String(value) => {
                    let len = u32::try_from(value.len()).map_err(|_| {
                        RowError::InvalidArgument(format!("string of {} bytes is too long", value.len()))
                    })?;
                    buf.put_u32(len);
                    buf.put_slice(value);
                }
            }
        }

        w.write_all(&buf).map_err(RowError::Write)
    }

    /// Reads one row of `header.num_cols()` cells.
    ///
    /// Each cell's type comes from its tag on the wire; it is not checked
    /// against the header's column types. Use [`Row::conforms_to`] for that.
    pub fn read_from<R: Read>(r: &mut R, header: &Header) -> Result<Row, RowError> {
        let num_cols = header.num_cols();
        let mut cells = Vec::new();
        cells.try_reserve_exact(num_cols)?;

        for position in 0..num_cols {
            let cell = read_cell(r)?;
            trace!(position, data_type = %cell.data_type(), "decoded cell");
            cells.push(cell);
        }

        Ok(Row::new(cells))
    }
}

fn read_word<R: Read>(r: &mut R) -> Result<[u8; 4], RowError> {
    let mut word = [0u8; 4];
    r.read_exact(&mut word).map_err(RowError::Read)?;
    Ok(word)
}

fn read_cell<R: Read>(r: &mut R) -> Result<Cell, RowError> {
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag).map_err(RowError::Read)?;

    match DataType::from_tag(tag[0]) {
        Some(DataType::Int) => Ok(Cell::Int(i32::from_be_bytes(read_word(r)?))),
        Some(DataType::Float) => Ok(Cell::Float(f32::from_bits(u32::from_be_bytes(read_word(r)?)))),
        Some(DataType::String) => {
            let len = u32::from_be_bytes(read_word(r)?) as usize;
            let mut payload = Vec::new();
            payload.try_reserve_exact(len)?;
            let read = r
                .by_ref()
                .take(len as u64)
                .read_to_end(&mut payload)
                .map_err(RowError::Read)?;
            if read != len {
                return Err(RowError::Read(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("string cell declared {len} bytes but only {read} were present"),
                )));
            }
            Ok(Cell::String(Bytes::from(payload)))
        }
        None => Err(RowError::Read(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown cell tag {}", tag[0]),
        ))),
    }
}
