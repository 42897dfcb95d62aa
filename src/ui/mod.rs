pub mod tui;

pub use tui::run_tui;
