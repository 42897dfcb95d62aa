//! Rows: typed cells, the row-literal parser and the binary row codec.
//!
//! A row literal looks like `(30 && Alice && 95.5)`. On disk each cell is a
//! one-byte type tag followed by its payload:
//!
//! ```text
//! int     tag 0 | i32 BE
//! float   tag 1 | f32 bits BE
//! string  tag 2 | len: u32 BE | raw bytes
//! ```

mod cell;
mod codec;
mod parse;

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

use crate::schema::DataType;

pub use cell::{Cell, Row};
pub use parse::{parse_row, SEPARATOR};

#[derive(Debug, Error)]
pub enum RowError {
    #[error("invalid row: {0}")]
    InvalidArgument(String),
    #[error("failed to allocate row")]
    MemoryAllocation(#[from] TryReserveError),
    #[error("cell {position} is {found} but column {column} is {expected}")]
    ColumnDataTypeCellValueMismatch {
        position: usize,
        column: String,
        expected: DataType,
        found: DataType,
    },
    #[error("row has no cells")]
    InvalidCells,
    #[error("failed to write row")]
    Write(#[source] io::Error),
    #[error("failed to read row")]
    Read(#[source] io::Error),
}
