use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rfk::commands::{execute_command, CommandOptions};
use rfk::ui::run_tui;

#[derive(Parser)]
#[command(name = "rfk", about = "Create, append to and inspect rfk table files")]
struct Cli {
    /// Table file to create or open
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Create a new table file; fails if the file already exists
    #[arg(short = 'n', long = "new", requires = "schema")]
    new: bool,

    /// Column list for a new table, e.g. "(age:int name:string score:float)"
    #[arg(short = 's', long = "schema", requires = "new")]
    schema: Option<String>,

    /// Row literal to append, e.g. "(30 && Alice && 95.5)"; may be repeated
    #[arg(short = 'a', long = "append")]
    append: Vec<String>,

    /// Print the table header
    #[arg(short = 'H', long = "header")]
    header: bool,

    /// Print every row
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Only list these columns, comma separated
    #[arg(short = 'c', long = "columns", value_delimiter = ',', requires = "list")]
    columns: Option<Vec<String>>,

    /// Browse the table in an interactive terminal viewer
    #[arg(long = "tui")]
    tui: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the table output
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let options = CommandOptions {
        new: cli.new,
        schema: cli.schema,
        append: cli.append,
        show_header: cli.header,
        list: cli.list,
        columns: cli.columns,
    };
    execute_command(&cli.file, &options)?;

    if cli.tui {
        run_tui(&cli.file)?;
    }

    Ok(())
}
