use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;
use tracing::trace;

use crate::growth::{push_doubling, with_initial_capacity};
use crate::{MAX_COLUMN_NAME_LENGTH, MAX_DATA_TYPE_NAME_LENGTH, MAX_SCHEMA_LENGTH};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema at byte {position}: {reason}")]
    InvalidArgument {
        position: usize,
        reason: &'static str,
    },
    #[error("failed to allocate column list")]
    MemoryAllocation(#[from] TryReserveError),
}

fn invalid(position: usize, reason: &'static str) -> SchemaError {
    SchemaError::InvalidArgument { position, reason }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Int = 0,
    Float = 1,
    String = 2,
}

impl DataType {
    /// The one-byte tag used for this type in headers and rows.
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DataType::Int),
            1 => Some(DataType::Float),
            2 => Some(DataType::String),
            _ => None,
        }
    }

    /// Matches a schema type token exactly (case-sensitive).
    pub fn from_token(token: &[u8]) -> Option<Self> {
        match token {
            b"int" => Some(DataType::Int),
            b"float" => Some(DataType::Float),
            b"string" => Some(DataType::String),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    data_type: DataType,
}

impl Column {
    /// Builds a column, enforcing the same name rules as the schema parser.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Result<Self, SchemaError> {
        let name = name.into();
        let bytes = name.as_bytes();
        match bytes.first() {
            None => return Err(invalid(0, "column name is empty")),
            Some(&first) if !is_name_start(first) => {
                return Err(invalid(0, "column name must start with a letter or underscore"))
            }
            _ => {}
        }
        if let Some(position) = bytes.iter().position(|&b| !is_name_body(b)) {
            return Err(invalid(position, "column name may only contain letters, digits and underscores"));
        }
        if bytes.len() > MAX_COLUMN_NAME_LENGTH {
            return Err(invalid(MAX_COLUMN_NAME_LENGTH, "column name too long"));
        }
        Ok(Self { name, data_type })
    }

    /// Builds a column without validating the name. Used when decoding
    /// headers, which trust what was written.
    pub(crate) fn from_parts(name: String, data_type: DataType) -> Self {
        Self { name, data_type }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.data_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        Ok(TableSchema {
            columns: parse_schema(text)?,
        })
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|col| col.name.eq_ignore_ascii_case(name))
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

/// Renders the schema back into its text form, e.g. `(age:int name:string)`.
impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{column}")?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ColumnNameStart,
    ColumnNameBody,
    TypeBody,
}

fn is_name_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_name_body(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

fn owned_name(name: &str) -> Result<String, TryReserveError> {
    let mut owned = String::new();
    owned.try_reserve_exact(name.len())?;
    owned.push_str(name);
    Ok(owned)
}

fn finish_type(bytes: &[u8], start: usize, end: usize) -> Result<DataType, SchemaError> {
    let token = &bytes[start..end];
    if token.len() >= MAX_DATA_TYPE_NAME_LENGTH {
        return Err(invalid(start, "data type name too long"));
    }
    DataType::from_token(token).ok_or_else(|| invalid(start, "unknown data type"))
}

/// Parses schema text of the form `(name:type name:type ...)`.
///
/// The scan is a single left-to-right pass over the bytes. Any error drops
/// the columns collected so far.
pub fn parse_schema(text: &str) -> Result<Vec<Column>, SchemaError> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(invalid(0, "schema must start with '('"));
    }

    let mut columns = with_initial_capacity()?;
    let mut state = State::ColumnNameStart;
    let mut token_start = 1;
    let mut pending_name = "";
    let mut i = 1;

    loop {
        if i >= MAX_SCHEMA_LENGTH {
            return Err(invalid(i, "schema exceeds maximum length"));
        }
        let Some(&ch) = bytes.get(i) else {
            return Err(invalid(i, "missing closing ')'"));
        };
        if ch == b')' {
            break;
        }

        state = match state {
            State::ColumnNameStart => {
                if !is_name_start(ch) {
                    return Err(invalid(i, "column name must start with a letter or underscore"));
                }
                State::ColumnNameBody
            }
            State::ColumnNameBody => {
                if ch == b':' {
                    if i - token_start > MAX_COLUMN_NAME_LENGTH {
                        return Err(invalid(token_start, "column name too long"));
                    }
                    // Every byte in the name was ASCII, so these are char boundaries.
                    pending_name = &text[token_start..i];
                    token_start = i + 1;
                    State::TypeBody
                } else if is_name_body(ch) {
                    State::ColumnNameBody
                } else {
                    return Err(invalid(
                        i,
                        "column name may only contain letters, digits and underscores",
                    ));
                }
            }
            State::TypeBody => {
                if ch == b' ' {
                    let data_type = finish_type(bytes, token_start, i)?;
                    let column = Column::from_parts(owned_name(pending_name)?, data_type);
                    push_doubling(&mut columns, column)?;
                    token_start = i + 1;
                    State::ColumnNameStart
                } else if ch.is_ascii_lowercase() {
                    State::TypeBody
                } else {
                    return Err(invalid(i, "data type may only contain lowercase letters"));
                }
            }
        };
        i += 1;
    }

    if state != State::TypeBody {
        return Err(invalid(i, "schema ended before a column type"));
    }
    let data_type = finish_type(bytes, token_start, i)?;
    let column = Column::from_parts(owned_name(pending_name)?, data_type);
    push_doubling(&mut columns, column)?;

    if i + 1 != bytes.len() {
        return Err(invalid(i + 1, "unexpected input after ')'"));
    }

    trace!(columns = columns.len(), "parsed schema");
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(text: &str) {
        match parse_schema(text) {
            Err(SchemaError::InvalidArgument { .. }) => {}
            other => panic!("expected InvalidArgument for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn parses_three_columns_in_order() {
        let columns = parse_schema("(age:int name:string score:float)").unwrap();
        let parsed: Vec<_> = columns
            .iter()
            .map(|c| (c.name(), c.data_type()))
            .collect();
        assert_eq!(
            parsed,
            vec![
                ("age", DataType::Int),
                ("name", DataType::String),
                ("score", DataType::Float),
            ]
        );
    }

    #[test]
    fn display_reproduces_schema_text() {
        for text in [
            "(age:int name:string score:float)",
            "(_x:float)",
            "(A1:string b_2:int _:int)",
        ] {
            let schema = TableSchema::parse(text).unwrap();
            assert_eq!(schema.to_string(), text);
        }
    }

    #[test]
    fn rejects_digit_at_name_start() {
        assert_invalid("(1bad:int)");
        assert_invalid("(good:int 2bad:int)");
    }

    #[test]
    fn rejects_missing_open_paren() {
        assert_invalid("age:int)");
        assert_invalid("");
    }

    #[test]
    fn rejects_empty_and_incomplete_schemas() {
        assert_invalid("()");
        assert_invalid("(abc)");
        assert_invalid("(int)");
        assert_invalid("(a:)");
        assert_invalid("(a:int )");
        assert_invalid("(a:int  b:int)");
        assert_invalid("(a:int");
    }

    #[test]
    fn rejects_trailing_input() {
        assert_invalid("(a:int)x");
    }

    #[test]
    fn rejects_bad_name_characters() {
        assert_invalid("(na-me:int)");
        assert_invalid("(na me:int)");
    }

    #[test]
    fn name_length_boundary() {
        let ok = format!("({}:int)", "a".repeat(MAX_COLUMN_NAME_LENGTH));
        let columns = parse_schema(&ok).unwrap();
        assert_eq!(columns[0].name().len(), MAX_COLUMN_NAME_LENGTH);

        let too_long = format!("({}:int)", "a".repeat(MAX_COLUMN_NAME_LENGTH + 1));
        assert_invalid(&too_long);
    }

    #[test]
    fn rejects_unknown_or_malformed_types() {
        assert_invalid("(a:integer)");
        assert_invalid("(a:strings)");
        assert_invalid("(a:Int)");
        assert_invalid("(a:in)");
        assert_invalid("(a:double)");
        assert_invalid("(a:i2t)");
    }

    #[test]
    fn schema_length_boundary() {
        // 437 `a:int` columns plus a trailing `a:float` is exactly the cap.
        let mut specs = vec!["a:int"; 437];
        specs.push("a:float");
        let at_cap = format!("({})", specs.join(" "));
        assert_eq!(at_cap.len(), MAX_SCHEMA_LENGTH);
        assert_eq!(parse_schema(&at_cap).unwrap().len(), 438);

        specs.pop();
        specs.push("a:string");
        let over_cap = format!("({})", specs.join(" "));
        assert_eq!(over_cap.len(), MAX_SCHEMA_LENGTH + 1);
        assert_invalid(&over_cap);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let specs: Vec<String> = (0..25).map(|i| format!("c{i}:int")).collect();
        let columns = parse_schema(&format!("({})", specs.join(" "))).unwrap();
        assert_eq!(columns.len(), 25);
        assert_eq!(columns[24].name(), "c24");
    }

    #[test]
    fn column_new_validates_name() {
        assert!(Column::new("ok_1", DataType::Int).is_ok());
        assert!(Column::new("", DataType::Int).is_err());
        assert!(Column::new("9lives", DataType::Int).is_err());
        assert!(Column::new("has space", DataType::Int).is_err());
        assert!(Column::new("a".repeat(256), DataType::Int).is_err());
    }

    #[test]
    fn column_index_lookup_ignores_case() {
        let schema = TableSchema::parse("(age:int Name:string)").unwrap();
        assert_eq!(schema.get_column_index("name"), Some(1));
        assert_eq!(schema.get_column_index("missing"), None);
    }

    #[test]
    fn data_type_tags_round_trip() {
        for dt in [DataType::Int, DataType::Float, DataType::String] {
            assert_eq!(DataType::from_tag(dt.tag()), Some(dt));
        }
        assert_eq!(DataType::from_tag(3), None);
    }
}
