pub mod commands;
pub mod file;
pub mod growth;
pub mod header;
pub mod row;
pub mod schema;
pub mod table;
pub mod ui;

// Format limits
pub const MAX_COLUMN_NAME_LENGTH: usize = 255;
pub const MAX_DATA_TYPE_NAME_LENGTH: usize = 7;
pub const MAX_SCHEMA_LENGTH: usize = 2631;
pub const MAX_NUM_CELLS: usize = 438;

// Header layout
pub const MAGIC: [u8; 3] = *b"rfk";
pub const VERSION: u8 = 1;
pub const ROW_COUNT_OFFSET: u64 = 4;
pub const HEADER_PREFIX_SIZE: usize = 12;

// Re-export main types for convenience
pub use commands::execute_command;
pub use file::FileError;
pub use header::{Header, HeaderError};
pub use row::{parse_row, Cell, Row, RowError};
pub use schema::{parse_schema, Column, DataType, SchemaError, TableSchema};
pub use table::{Table, TableError};
