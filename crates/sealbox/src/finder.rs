//! Interactive finder over the decrypted document
//!
//! A single-threaded event loop: draw, block on the next terminal event,
//! update state, repeat until a cancel key arrives. Raw mode and the
//! alternate screen are acquired before the loop and released on every
//! exit path, error or not.

use std::io;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use sealbox_core::{Document, VaultError};

/// Outcome of handling one input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Quit,
}

/// Finder state: the query line, the entry names on display, and the
/// last seen terminal dimensions.
pub struct App {
    pub query: String,
    pub names: Vec<String>,
    pub size: (u16, u16),
}

impl App {
    pub fn new(document: &Document) -> Self {
        Self {
            query: String::new(),
            names: document
                .entries()
                .iter()
                .map(|e| e.name.clone())
                .collect(),
            size: (0, 0),
        }
    }

    /// Pure event handler; `Quit` ends the loop with no further render.
    pub fn on_event(&mut self, event: &Event) -> Signal {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => Signal::Quit,
                KeyCode::Char(c) => {
                    self.query.push(c);
                    Signal::Continue
                }
                KeyCode::Backspace => {
                    self.query.pop();
                    Signal::Continue
                }
                _ => Signal::Continue,
            },
            Event::Resize(width, height) => {
                self.size = (*width, *height);
                Signal::Continue
            }
            _ => Signal::Continue,
        }
    }
}

/// Run the finder over a decrypted document. Read-only: the document is
/// never modified here.
pub fn run(document: &Document) -> Result<(), VaultError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(document);
    let result = run_loop(&mut terminal, &mut app);

    // Restore the terminal before surfacing any loop error
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), VaultError> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        let event = event::read()?;
        if app.on_event(&event) == Signal::Quit {
            return Ok(());
        }
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Query
            Constraint::Min(0),    // Entries
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    let query = Paragraph::new(Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Cyan).bold()),
        Span::raw(app.query.as_str()),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" Find "));
    f.render_widget(query, chunks[0]);

    let items: Vec<ListItem> = app
        .names
        .iter()
        .map(|name| ListItem::new(name.as_str()))
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Entries ({}) ", app.names.len())),
    );
    f.render_widget(list, chunks[1]);

    let footer = Paragraph::new(Line::from(Span::styled(
        " type to edit query - q or Esc to quit ",
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(footer, chunks[2]);
}
