/// NexusCorr terminal client
///
/// Five ticker inputs (first two required), a connection indicator and the live correlation
/// matrix streamed by the server. Tab/Shift-Tab move between inputs, Enter validates and
/// submits, Esc quits.
use std::{error::Error, io, sync::Arc, time::Duration};

use chrono::Local;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nexuscorr_tui::{
    init_logging, Cell as MatrixCell, ClientConfig, ConnectionManager, ConnectionState,
    HttpSymbolRegistry, MatrixStore, PassReport, PassResult, SymbolValidator, ValidationSession,
    MIN_TICKERS, SLOT_COUNT,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use rustls::crypto::ring::default_provider;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const C_POS: Color = Color::Rgb(100, 220, 100);
const C_NEG: Color = Color::Rgb(220, 100, 100);
const C_WARN: Color = Color::Rgb(220, 200, 100);
const C_DIM: Color = Color::Rgb(120, 120, 120);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
const C_ACCENT: Color = Color::Rgb(100, 180, 220);

struct App {
    session: ValidationSession,
    store: MatrixStore,
    focus: usize,
}

impl App {
    fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % SLOT_COUNT;
    }

    fn focus_prev(&mut self) {
        self.focus = (self.focus + SLOT_COUNT - 1) % SLOT_COUNT;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    FocusNext,
    FocusPrev,
    Submit,
    Backspace,
    Input(char),
}

/// Map a key event to an app action. Only presses count, and Ctrl chords never type.
fn key_action(key: &KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('c') if ctrl => Some(Action::Quit),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => Some(Action::Input(c)),
        KeyCode::Tab | KeyCode::Down => Some(Action::FocusNext),
        KeyCode::BackTab | KeyCode::Up => Some(Action::FocusPrev),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Backspace => Some(Action::Backspace),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = default_provider().install_default();

    let config = ClientConfig::from_env()?;
    init_logging(config.log_file.as_deref())?;

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (connection, mut snapshot_rx) = ConnectionManager::connect(&config);
    let validator = Arc::new(SymbolValidator::new(HttpSymbolRegistry::new(
        config.registry_url.clone(),
        config.registry_timeout,
    )));

    let mut app = App {
        session: ValidationSession::new()
            .with_notice_ttl(config.notice_ttl)
            .with_tickers(&config.tickers),
        store: MatrixStore::new(),
        focus: 0,
    };
    let mut pending: Option<JoinHandle<PassReport>> = None;
    let tick_rate = Duration::from_millis(100);

    loop {
        app.store.apply_pending(&mut snapshot_rx);

        if pending.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = pending.take() {
                match handle.await {
                    Ok(report) => {
                        if let Some(PassResult::Rejected(slots)) =
                            app.session.finish_pass(report, &connection)
                        {
                            info!(?slots, "submission blocked by invalid tickers");
                        }
                    }
                    Err(e) => {
                        warn!("Validation task failed: {}", e);
                        app.session.release_pass();
                    }
                }
            }
        }

        let state = connection.state();
        terminal.draw(|f| render_ui(f, &app, state))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                match key_action(&key) {
                    Some(Action::Quit) => break,
                    Some(Action::FocusNext) => app.focus_next(),
                    Some(Action::FocusPrev) => app.focus_prev(),
                    Some(Action::Submit) => {
                        if let Ok(pass) = app.session.begin_pass() {
                            let validator = Arc::clone(&validator);
                            pending = Some(tokio::spawn(async move { pass.run(&validator).await }));
                        }
                    }
                    Some(Action::Backspace) => {
                        let _ = app.session.pop_char(app.focus);
                    }
                    Some(Action::Input(c)) => {
                        let _ = app.session.push_char(app.focus, c);
                    }
                    None => {}
                }
            }
        }
    }

    connection.close();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn render_ui(f: &mut Frame, app: &App, state: ConnectionState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
        ])
        .split(f.area());

    render_header(f, chunks[0], state);
    render_inputs(f, app, chunks[1]);
    render_status(f, app, chunks[2]);
    render_matrix(f, &app.store, chunks[3]);
}

fn render_header(f: &mut Frame, area: Rect, state: ConnectionState) {
    let color = match state {
        ConnectionState::Connected => C_POS,
        ConnectionState::Waiting => C_WARN,
        ConnectionState::Disconnected => C_NEG,
    };

    let line = Line::from(vec![
        Span::styled(
            "NexusCorr - Correlation Matrix",
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("● ", Style::default().fg(color)),
        Span::styled(state.as_str().to_uppercase(), Style::default().fg(color)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_inputs(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, SLOT_COUNT as u32); SLOT_COUNT])
        .split(area);

    let busy = app.session.is_busy();
    for (index, slot) in app.session.slots().iter().enumerate() {
        let required = if index < MIN_TICKERS { "*" } else { "" };
        let title = match slot.error() {
            Some(error) => format!(" Ticker {}{} - {} ", index + 1, required, error),
            None => format!(" Ticker {}{} ", index + 1, required),
        };

        let border = if slot.error().is_some() {
            C_NEG
        } else if busy {
            C_DIM
        } else if index == app.focus {
            C_ACCENT
        } else {
            C_BRIGHT
        };

        let text_style = if busy {
            Style::default().fg(C_DIM)
        } else {
            Style::default().fg(C_BRIGHT)
        };

        let input = Paragraph::new(Span::styled(slot.raw().to_string(), text_style)).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        );
        f.render_widget(input, columns[index]);
    }
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    if app.session.is_busy() {
        spans.push(Span::styled("Validating...", Style::default().fg(C_WARN)));
    } else if let Some(error) = app.session.error() {
        spans.push(Span::styled(error.to_string(), Style::default().fg(C_NEG)));
    } else if let Some(notice) = app.session.notice() {
        spans.push(Span::styled(notice.to_string(), Style::default().fg(C_POS)));
    } else {
        spans.push(Span::styled(
            "[Enter] track  [Tab] next  [Esc] quit",
            Style::default().fg(C_DIM),
        ));
    }

    if let Some(updated) = app.store.last_update() {
        spans.push(Span::styled(
            format!(
                "  | {} snapshots, last {}",
                app.store.snapshot_count(),
                updated.with_timezone(&Local).format("%H:%M:%S")
            ),
            Style::default().fg(C_DIM),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_matrix(f: &mut Frame, store: &MatrixStore, area: Rect) {
    let block = Block::default()
        .title(" CORRELATION ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    if store.is_empty() {
        let placeholder = Paragraph::new(Span::styled(
            "Waiting for data...",
            Style::default().fg(C_DIM),
        ))
        .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(store.symbols().iter().map(|s| {
                Cell::from(s.as_str()).style(Style::default().add_modifier(Modifier::BOLD))
            })),
    );

    let rows = store.rows().map(|(row_symbol, cells)| {
        let mut row = vec![Cell::from(row_symbol.to_string())
            .style(Style::default().add_modifier(Modifier::BOLD))];
        row.extend(cells.iter().enumerate().map(|(col, cell)| {
            let diagonal = store.symbols().get(col).is_some_and(|s| s == row_symbol);
            Cell::from(cell.to_string()).style(cell_style(cell, diagonal))
        }));
        Row::new(row)
    });

    let widths = std::iter::repeat(Constraint::Length(10)).take(store.symbols().len() + 1);
    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

/// Green for positive, red for negative, shaded by magnitude; unknown cells stay unshaded
fn cell_style(cell: &MatrixCell, diagonal: bool) -> Style {
    let mut style = Style::default().fg(C_BRIGHT);
    if diagonal {
        style = style.add_modifier(Modifier::DIM);
    }
    if cell.value().is_none() {
        return style.fg(C_DIM);
    }

    // intensity is at most 0.3
    let shade = (cell.intensity() / 0.3 * 140.0) as u8;
    let bg = if cell.is_positive() {
        Color::Rgb(0, shade, 0)
    } else {
        Color::Rgb(shade, 0, 0)
    };
    style.bg(bg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_key_action() {
        struct TestCase {
            input: KeyEvent,
            expected: Option<Action>,
        }

        let cases = vec![
            // TC0: plain character types into the slot
            TestCase {
                input: press(KeyCode::Char('b'), KeyModifiers::NONE),
                expected: Some(Action::Input('b')),
            },
            // TC1: shifted character still types
            TestCase {
                input: press(KeyCode::Char('B'), KeyModifiers::SHIFT),
                expected: Some(Action::Input('B')),
            },
            // TC2: Ctrl-C quits
            TestCase {
                input: press(KeyCode::Char('c'), KeyModifiers::CONTROL),
                expected: Some(Action::Quit),
            },
            // TC3: other Ctrl chords are ignored
            TestCase {
                input: press(KeyCode::Char('a'), KeyModifiers::CONTROL),
                expected: None,
            },
            // TC4: Esc quits
            TestCase {
                input: press(KeyCode::Esc, KeyModifiers::NONE),
                expected: Some(Action::Quit),
            },
            // TC5: Enter submits
            TestCase {
                input: press(KeyCode::Enter, KeyModifiers::NONE),
                expected: Some(Action::Submit),
            },
            // TC6: BackTab moves focus back
            TestCase {
                input: press(KeyCode::BackTab, KeyModifiers::SHIFT),
                expected: Some(Action::FocusPrev),
            },
            // TC7: key release is ignored
            TestCase {
                input: KeyEvent {
                    code: KeyCode::Char('b'),
                    modifiers: KeyModifiers::NONE,
                    kind: KeyEventKind::Release,
                    state: KeyEventState::NONE,
                },
                expected: None,
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            assert_eq!(key_action(&test.input), test.expected, "TC{} failed", index);
        }
    }
}
