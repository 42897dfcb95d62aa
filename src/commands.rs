use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::{Cell, Header, Row, Table, TableSchema};

/// What the command line asked for, in the order it is carried out:
/// create or open, append, print the header, list rows.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    pub new: bool,
    pub schema: Option<String>,
    pub append: Vec<String>,
    pub show_header: bool,
    pub list: bool,
    pub columns: Option<Vec<String>>,
}

pub fn execute_command(table_path: &Path, options: &CommandOptions) -> Result<()> {
    let mut table = if options.new {
        let schema = options
            .schema
            .as_deref()
            .context("creating a table requires a schema")?;
        handle_create(table_path, schema)?
    } else {
        if options.schema.is_some() {
            bail!("a schema can only be given when creating a table");
        }
        Table::open(table_path)
            .with_context(|| format!("failed to open table {}", table_path.display()))?
    };

    for row in &options.append {
        handle_append(&mut table, row)?;
    }

    if options.show_header {
        handle_header(table.header());
    }

    if options.list {
        handle_list(&mut table, options.columns.as_deref())?;
    }

    Ok(())
}

fn handle_create(table_path: &Path, schema: &str) -> Result<Table> {
    let table = Table::create(table_path, schema)
        .with_context(|| format!("failed to create table {}", table_path.display()))?;

    println!("created table {}", table_path.display());
    for column in table.header().columns() {
        println!("  {}: {}", column.name(), column.data_type());
    }

    Ok(table)
}

fn handle_append(table: &mut Table, row_text: &str) -> Result<()> {
    let row = table
        .append(row_text)
        .with_context(|| format!("failed to append row {row_text}"))?;
    println!("appended row {}: {}", table.row_count(), row);
    Ok(())
}

fn handle_header(header: &Header) {
    println!("{header}");
}

fn handle_list(table: &mut Table, column_names: Option<&[String]>) -> Result<()> {
    let rows = table.rows()?;
    let schema = TableSchema {
        columns: table.header().columns().to_vec(),
    };

    match column_names {
        Some(names) => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let values = extract_columns(&schema, &rows, &names)?;

            println!("{}", names.join("|"));
            for row in values {
                let row_values: Vec<String> = row.iter().map(|val| val.to_display_string()).collect();
                println!("{}", row_values.join("|"));
            }
        }
        None => display_table_data(&schema, &rows),
    }

    Ok(())
}

/// Extract specific columns from the rows, in the requested order
fn extract_columns<'a>(schema: &TableSchema, rows: &'a [Row], column_names: &[&str]) -> Result<Vec<Vec<&'a Cell>>> {
    let mut column_indices = Vec::new();

    for col_name in column_names {
        let index = schema
            .get_column_index(col_name)
            .ok_or_else(|| anyhow::anyhow!("Column '{}' not found in table", col_name))?;
        column_indices.push(index);
    }

    let mut results = Vec::new();
    for row in rows {
        let mut row_values = Vec::new();
        for &col_index in &column_indices {
            if let Some(value) = row.get(col_index) {
                row_values.push(value);
            }
        }
        results.push(row_values);
    }

    Ok(results)
}

/// Display rows under a header line of column names
fn display_table_data(schema: &TableSchema, rows: &[Row]) {
    let headers: Vec<&str> = schema.columns.iter().map(|col| col.name()).collect();
    println!("{}", headers.join("|"));

    let separator = headers
        .iter()
        .map(|h| "-".repeat(h.len().max(10)))
        .collect::<Vec<_>>()
        .join("|");
    println!("{}", separator);

    for row in rows {
        println!("{}", row);
    }
}
