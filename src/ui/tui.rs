use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Tabs, Wrap},
    Frame, Terminal,
};
use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{Row as DataRow, Table as DataTable};

const COLUMN_WIDTH: u16 = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppMode {
    Rows,
    Header,
}

pub struct App {
    pub table_path: PathBuf,
    pub table: DataTable,
    pub rows: Vec<DataRow>,
    pub mode: AppMode,
    pub vertical_scroll: usize,
    pub horizontal_scroll: usize,
    pub header_scroll: u16,
    pub show_help: bool,
    pub status_message: String,
    pub status_style: Style,
}

impl App {
    pub fn new(table_path: &Path) -> Result<Self> {
        let mut table = DataTable::open(table_path)?;
        let rows = table.rows()?;
        let status_message = format!("Loaded {} rows", rows.len());

        Ok(Self {
            table_path: table_path.to_path_buf(),
            table,
            rows,
            mode: AppMode::Rows,
            vertical_scroll: 0,
            horizontal_scroll: 0,
            header_scroll: 0,
            show_help: false,
            status_message,
            status_style: Style::default().fg(Color::Green),
        })
    }

    /// Re-reads the header and rows from disk, picking up appends made by
    /// another process since the viewer started.
    pub fn reload(&mut self) {
        let reloaded = DataTable::open(&self.table_path).and_then(|mut table| {
            let rows = table.rows()?;
            Ok((table, rows))
        });

        match reloaded {
            Ok((table, rows)) => {
                self.table = table;
                self.rows = rows;
                self.scroll_to_top();
                let message = format!("Reloaded {} rows", self.rows.len());
                self.set_status(&message, Style::default().fg(Color::Green));
            }
            Err(e) => {
                let message = format!("Reload failed: {e}");
                self.set_status(&message, Style::default().fg(Color::Red));
            }
        }
    }

    pub fn next_mode(&mut self) {
        self.mode = match self.mode {
            AppMode::Rows => AppMode::Header,
            AppMode::Header => AppMode::Rows,
        };
    }

    pub fn scroll_up(&mut self) {
        match self.mode {
            AppMode::Rows => self.vertical_scroll = self.vertical_scroll.saturating_sub(1),
            AppMode::Header => self.header_scroll = self.header_scroll.saturating_sub(1),
        }
    }

    pub fn scroll_down(&mut self) {
        match self.mode {
            AppMode::Rows => {
                let max_scroll = self.rows.len().saturating_sub(1);
                if self.vertical_scroll < max_scroll {
                    self.vertical_scroll += 1;
                }
            }
            AppMode::Header => {
                let max_scroll = self.table.header().num_cols() as u16;
                if self.header_scroll < max_scroll {
                    self.header_scroll += 1;
                }
            }
        }
    }

    pub fn scroll_left(&mut self) {
        self.horizontal_scroll = self.horizontal_scroll.saturating_sub(1);
    }

    pub fn scroll_right(&mut self) {
        let max_horizontal_scroll = self.table.header().num_cols().saturating_sub(1);
        if self.horizontal_scroll < max_horizontal_scroll {
            self.horizontal_scroll += 1;
        }
    }

    pub fn scroll_down_fast(&mut self) {
        let max_scroll = self.rows.len().saturating_sub(1);
        self.vertical_scroll = (self.vertical_scroll + 10).min(max_scroll);
    }

    pub fn scroll_up_fast(&mut self) {
        self.vertical_scroll = self.vertical_scroll.saturating_sub(10);
    }

    pub fn scroll_to_top(&mut self) {
        self.vertical_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.vertical_scroll = self.rows.len().saturating_sub(1);
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn set_status(&mut self, message: &str, style: Style) {
        self.status_message = message.to_string();
        self.status_style = style;
    }
}

pub fn run_tui(table_path: &Path) -> Result<()> {
    // Load before touching the terminal so open errors print normally
    let mut app = App::new(table_path)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key_event(app, key) {
                    return Ok(());
                }
            }
        }
    }
}

/// Returns `true` when the viewer should exit.
fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    if app.show_help {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
            app.toggle_help();
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Tab | KeyCode::BackTab => app.next_mode(),
        KeyCode::Char('r') => app.reload(),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_up(),
        KeyCode::Down | KeyCode::Char('j') => app.scroll_down(),
        KeyCode::Left | KeyCode::Char('h') => app.scroll_left(),
        KeyCode::Right | KeyCode::Char('l') => app.scroll_right(),
        KeyCode::PageUp => app.scroll_up_fast(),
        KeyCode::PageDown => app.scroll_down_fast(),
        KeyCode::Home | KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::End | KeyCode::Char('G') => app.scroll_to_bottom(),
        _ => {}
    }

    false
}

fn ui(f: &mut Frame, app: &App) {
    if app.show_help {
        render_help(f);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_tabs(f, chunks[0], app);
    match app.mode {
        AppMode::Rows => render_rows(f, chunks[1], app),
        AppMode::Header => render_header(f, chunks[1], app),
    }
    render_status_bar(f, chunks[2], app);
}

fn render_tabs(f: &mut Frame, area: Rect, app: &App) {
    let tabs = Tabs::new(vec!["Rows", "Header"])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("rfk: {}", app.table_path.display())),
        )
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .select(match app.mode {
            AppMode::Rows => 0,
            AppMode::Header => 1,
        });
    f.render_widget(tabs, area);
}

fn render_rows(f: &mut Frame, area: Rect, app: &App) {
    if app.rows.is_empty() {
        let paragraph = Paragraph::new("No rows in table")
            .block(Block::default().borders(Borders::ALL).title("Rows"))
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(paragraph, area);
        return;
    }

    let columns = app.table.header().columns();
    let total_columns = columns.len();
    let visible_columns_count = ((area.width.saturating_sub(4)) / (COLUMN_WIDTH + 2)).max(1) as usize;
    let start_col = app.horizontal_scroll.min(total_columns.saturating_sub(1));
    let end_col = (start_col + visible_columns_count).min(total_columns);

    let headers: Vec<String> = columns[start_col..end_col]
        .iter()
        .map(|col| format!("{} ({})", col.name(), col.data_type()))
        .collect();

    let visible_height = area.height.saturating_sub(4) as usize; // Borders and header
    let max_vertical_scroll = app.rows.len().saturating_sub(visible_height);
    let vertical_scroll = app.vertical_scroll.min(max_vertical_scroll);

    let visible_rows: Vec<Row> = app
        .rows
        .iter()
        .skip(vertical_scroll)
        .take(visible_height)
        .map(|row| {
            let cells: Vec<String> = row
                .cells()
                .iter()
                .skip(start_col)
                .take(end_col - start_col)
                .map(|cell| {
                    let display = cell.to_display_string();
                    if display.chars().count() > COLUMN_WIDTH as usize {
                        let truncated: String = display.chars().take(COLUMN_WIDTH as usize - 3).collect();
                        format!("{truncated}...")
                    } else {
                        display
                    }
                })
                .collect();
            Row::new(cells)
        })
        .collect();

    let widths = headers
        .iter()
        .map(|_| Constraint::Length(COLUMN_WIDTH))
        .collect::<Vec<_>>();

    let scroll_info = format!(
        " │ Rows: {}-{}/{} │ Cols: {}-{}/{}",
        vertical_scroll + 1,
        vertical_scroll + visible_rows.len(),
        app.rows.len(),
        start_col + 1,
        end_col,
        total_columns
    );

    let table = Table::new(visible_rows, widths)
        .header(
            Row::new(headers)
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Rows{scroll_info}"))
                .title_style(Style::default().fg(Color::Green)),
        );

    f.render_widget(table, area);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let header = app.table.header();
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Magic:    ", Style::default().fg(Color::Cyan)),
            Span::raw(String::from_utf8_lossy(&header.magic()).into_owned()),
        ]),
        Line::from(vec![
            Span::styled("Version:  ", Style::default().fg(Color::Cyan)),
            Span::raw(header.version().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Rows:     ", Style::default().fg(Color::Cyan)),
            Span::raw(header.num_rows().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Columns:  ", Style::default().fg(Color::Cyan)),
            Span::raw(header.num_cols().to_string()),
        ]),
        Line::from(""),
    ];
    for (index, column) in header.columns().iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("{index:>4}  "), Style::default().fg(Color::DarkGray)),
            Span::styled(column.name().to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(": "),
            Span::styled(column.data_type().to_string(), Style::default().fg(Color::Yellow)),
        ]));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Header"))
        .scroll((app.header_scroll, 0));
    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mode_specific_help = match app.mode {
        AppMode::Rows => "j/k: scroll rows | h/l: scroll columns | PageUp/Down: fast scroll | g/G: top/bottom",
        AppMode::Header => "j/k: scroll",
    };

    let status_text = vec![Line::from(vec![
        Span::styled("Status: ", Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::styled(app.status_message.clone(), app.status_style),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(mode_specific_help, Style::default().fg(Color::DarkGray)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled("Tab: Switch | r: Reload | q: Quit | ?: Help", Style::default().fg(Color::DarkGray)),
    ])];

    let paragraph = Paragraph::new(status_text).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn render_help(f: &mut Frame) {
    let area = centered_rect(60, 60, f.size());

    f.render_widget(Clear, area);

    let section = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let help_text = vec![
        Line::from(vec![Span::styled(
            "rfk viewer - Help",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from(vec![Span::styled("Global Keys:", section)]),
        Line::from("  Tab / Shift+Tab    - Switch between Rows and Header"),
        Line::from("  r                  - Reload the table from disk"),
        Line::from("  q / Esc / Ctrl+Q   - Quit"),
        Line::from("  ?                  - Toggle this help"),
        Line::from(""),
        Line::from(vec![Span::styled("Rows View:", section)]),
        Line::from("  ↑/↓ or k/j         - Scroll rows"),
        Line::from("  ←/→ or h/l         - Scroll columns"),
        Line::from("  Page Up/Down       - Fast scroll (10 rows)"),
        Line::from("  g/G or Home/End    - Jump to top/bottom"),
        Line::from(""),
        Line::from(vec![Span::styled("Press ? or Esc to close help", Style::default().fg(Color::Yellow))]),
    ];

    let paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .title_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        )
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use tempfile::tempdir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn sample_app() -> Result<(tempfile::TempDir, App)> {
        let dir = tempdir()?;
        let path = dir.path().join("people.rfk");
        let mut table = DataTable::create(&path, "(age:int name:string)")?;
        for i in 0..25 {
            table.append(&format!("({i} && name{i})"))?;
        }
        let app = App::new(&path)?;
        Ok((dir, app))
    }

    #[test]
    fn scrolling_is_bounded() -> Result<()> {
        let (_dir, mut app) = sample_app()?;
        assert_eq!(app.rows.len(), 25);

        handle_key_event(&mut app, key(KeyCode::Up));
        assert_eq!(app.vertical_scroll, 0);

        handle_key_event(&mut app, key(KeyCode::PageDown));
        handle_key_event(&mut app, key(KeyCode::PageDown));
        handle_key_event(&mut app, key(KeyCode::PageDown));
        assert_eq!(app.vertical_scroll, 24);

        handle_key_event(&mut app, key(KeyCode::Char('g')));
        assert_eq!(app.vertical_scroll, 0);

        handle_key_event(&mut app, key(KeyCode::Right));
        handle_key_event(&mut app, key(KeyCode::Right));
        assert_eq!(app.horizontal_scroll, 1);
        Ok(())
    }

    #[test]
    fn help_swallows_keys_until_closed() -> Result<()> {
        let (_dir, mut app) = sample_app()?;
        handle_key_event(&mut app, key(KeyCode::Char('?')));
        assert!(app.show_help);
        assert!(!handle_key_event(&mut app, key(KeyCode::Char('q'))));
        handle_key_event(&mut app, key(KeyCode::Esc));
        assert!(!app.show_help);
        assert!(handle_key_event(&mut app, key(KeyCode::Char('q'))));
        Ok(())
    }

    #[test]
    fn reload_picks_up_new_rows() -> Result<()> {
        let (_dir, mut app) = sample_app()?;
        DataTable::open(&app.table_path)?.append("(99 && late)")?;
        handle_key_event(&mut app, key(KeyCode::Char('r')));
        assert_eq!(app.rows.len(), 26);
        assert_eq!(app.table.row_count(), 26);
        Ok(())
    }

    #[test]
    fn tab_switches_views() -> Result<()> {
        let (_dir, mut app) = sample_app()?;
        handle_key_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.mode, AppMode::Header);
        handle_key_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.mode, AppMode::Rows);
        Ok(())
    }
}
