use bytes::Bytes;
use tracing::trace;

use super::{Cell, Row, RowError};
use crate::growth::{push_doubling, with_initial_capacity};
use crate::header::Header;
use crate::schema::{Column, DataType};
use crate::MAX_NUM_CELLS;

/// Cell delimiter inside a row literal.
pub const SEPARATOR: &[u8; 4] = b" && ";

/// Type inferred for the cell currently being scanned. Inference only ever
/// moves towards `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Int,
    Float,
    String,
}

impl Inferred {
    fn observe(self, ch: u8) -> Self {
        match self {
            Inferred::String => Inferred::String,
            _ if ch.is_ascii_digit() => self,
            Inferred::Int if ch == b'.' => Inferred::Float,
            _ => Inferred::String,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            Inferred::Int => DataType::Int,
            Inferred::Float => DataType::Float,
            Inferred::String => DataType::String,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    CellScanning { start: usize, inferred: Inferred },
    SeparatorLookahead { start: usize, inferred: Inferred },
}

fn invalid(reason: impl Into<String>) -> RowError {
    RowError::InvalidArgument(reason.into())
}

fn close_cell(columns: &[Column], position: usize, token: &str, inferred: Inferred) -> Result<Cell, RowError> {
    let column = columns
        .get(position)
        .ok_or_else(|| invalid(format!("cell {position} has no matching column")))?;
    let found = inferred.data_type();
    if found != column.data_type() {
        return Err(RowError::ColumnDataTypeCellValueMismatch {
            position,
            column: column.name().to_owned(),
            expected: column.data_type(),
            found,
        });
    }

    match found {
        DataType::Int => token
            .parse::<i32>()
            .map(Cell::Int)
            .map_err(|e| invalid(format!("cell {position} {token:?} is not an int: {e}"))),
        DataType::Float => token
            .parse::<f32>()
            .map(Cell::Float)
            .map_err(|e| invalid(format!("cell {position} {token:?} is not a float: {e}"))),
        DataType::String => {
            let mut value = Vec::new();
            value.try_reserve_exact(token.len())?;
            value.extend_from_slice(token.as_bytes());
            Ok(Cell::String(Bytes::from(value)))
        }
    }
}

/// Parses a row literal such as `(30 && Alice && 95.5)` against `header`.
///
/// Each cell's type is inferred from its characters and must match the
/// declared type of the column at the same position. Cells are separated
/// by exactly `" && "`.
pub fn parse_row(header: &Header, text: &str) -> Result<Row, RowError> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(invalid("row must start with '('"));
    }

    let columns = header.columns();
    let mut cells = with_initial_capacity()?;
    let mut state = State::CellScanning {
        start: 1,
        inferred: Inferred::Int,
    };
    let mut i = 1;

    let (start, inferred) = loop {
        match state {
            State::CellScanning { start, inferred } => {
                let Some(&ch) = bytes.get(i) else {
                    return Err(invalid("missing closing ')'"));
                };
                if ch == b')' {
                    break (start, inferred);
                }
                if cells.len() >= MAX_NUM_CELLS {
                    return Err(invalid(format!("row exceeds {MAX_NUM_CELLS} cells")));
                }
                if cells.len() >= columns.len() {
                    return Err(invalid(format!("table only has {} columns", columns.len())));
                }
                if ch == b' ' {
                    state = State::SeparatorLookahead { start, inferred };
                    continue;
                }
                state = State::CellScanning {
                    start,
                    inferred: inferred.observe(ch),
                };
                i += 1;
            }
            State::SeparatorLookahead { start, inferred } => {
                if bytes[i..].starts_with(SEPARATOR) {
                    // `start` and `i` both sit next to ASCII bytes.
                    let cell = close_cell(columns, cells.len(), &text[start..i], inferred)?;
                    push_doubling(&mut cells, cell)?;
                    i += SEPARATOR.len();
                    state = State::CellScanning {
                        start: i,
                        inferred: Inferred::Int,
                    };
                } else {
                    state = State::CellScanning {
                        start,
                        inferred: inferred.observe(b' '),
                    };
                    i += 1;
                }
            }
        }
    };

    if cells.len() >= MAX_NUM_CELLS {
        return Err(invalid(format!("row exceeds {MAX_NUM_CELLS} cells")));
    }
    if cells.len() >= columns.len() {
        return Err(invalid(format!("table only has {} columns", columns.len())));
    }
    let cell = close_cell(columns, cells.len(), &text[start..i], inferred)?;
    push_doubling(&mut cells, cell)?;

    if i + 1 != bytes.len() {
        return Err(invalid("unexpected input after ')'"));
    }
    if cells.len() != columns.len() {
        return Err(invalid(format!(
            "row has {} cells but table has {} columns",
            cells.len(),
            columns.len()
        )));
    }

    trace!(cells = cells.len(), "parsed row");
    Ok(Row::new(cells))
}
