use std::fmt;

use bytes::Bytes;

use crate::header::Header;
use crate::schema::DataType;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i32),
    Float(f32),
    String(Bytes),
}

impl Cell {
    pub fn data_type(&self) -> DataType {
        match self {
            Cell::Int(_) => DataType::Int,
            Cell::Float(_) => DataType::Float,
            Cell::String(_) => DataType::String,
        }
    }

    /// Format the cell value for display
    pub fn to_display_string(&self) -> String {
        match self {
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::String(s) => String::from_utf8_lossy(s).into_owned(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Row { cells }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// Whether every cell's type matches the declared type of its column.
    pub fn conforms_to(&self, header: &Header) -> bool {
        self.cells.len() == header.num_cols()
            && self
                .cells
                .iter()
                .zip(header.columns())
                .all(|(cell, column)| cell.data_type() == column.data_type())
    }
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        Row::new(cells)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{cell}")?;
        }
        Ok(())
    }
}
