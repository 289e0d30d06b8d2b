use std::fs::File;
use std::io;
use std::sync::{Mutex, mpsc};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use matchday_board::config::BoardConfig;
use matchday_board::feed::spawn_board;
use matchday_board::slots::{DiscoveryError, discover_slots};
use matchday_board::state::{Delta, SlotBoard, SlotKind, SlotView, StatusKind, apply_delta};
use matchday_board::status::{implied_end, kickoff_local};

const CARD_HEIGHT: u16 = 7;
const CARDS_PER_ROW: usize = 3;

struct App {
    board: SlotBoard,
    cfg: BoardConfig,
    should_quit: bool,
    help_overlay: bool,
    show_console: bool,
}

impl App {
    fn new(board: SlotBoard, cfg: BoardConfig) -> Self {
        Self {
            board,
            cfg,
            should_quit: false,
            help_overlay: false,
            show_console: true,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') => self.show_console = !self.show_console,
            KeyCode::Char('?') => self.help_overlay = !self.help_overlay,
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let cfg = BoardConfig::from_env();
    init_logging(&cfg)?;

    let slots = match discover_slots(&cfg.slots_path) {
        Ok(slots) => slots,
        Err(DiscoveryError::NoSlots) => Vec::new(),
        Err(err) => {
            warn!(error = %err, "slot discovery failed");
            Vec::new()
        }
    };
    let board = SlotBoard::new(&slots);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let handle = spawn_board(cfg.clone(), slots, tx);

    let mut app = App::new(board, cfg);
    let res = run_app(&mut terminal, &mut app, rx);

    handle.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

/// Logs go to `BOARD_LOG` when set; stdout belongs to the terminal UI.
fn init_logging(cfg: &BoardConfig) -> Result<()> {
    let Some(path) = cfg.log_path.as_ref() else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("cannot open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.board, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit || app.board.stopped {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let console_height = if app.show_console { 6 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(console_height),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(app.board.page_title())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_cards(frame, chunks[1], app);

    if app.show_console {
        render_console(frame, chunks[2], &app.board);
    }

    let footer = match app.board.error.as_deref() {
        Some(err) => Paragraph::new(err.to_string()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new("c Console | ? Help | q Quit").style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, chunks[3]);

    if app.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn render_cards(frame: &mut Frame, area: Rect, app: &App) {
    if app.board.slots.is_empty() {
        let empty = Paragraph::new("No match slots found").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }
    if area.height < CARD_HEIGHT {
        let empty = Paragraph::new("Board needs more height").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let rows_visible = (area.height / CARD_HEIGHT) as usize;
    let card_width = area.width / CARDS_PER_ROW as u16;
    for (idx, view) in app.board.slots.iter().enumerate().take(rows_visible * CARDS_PER_ROW) {
        let row = (idx / CARDS_PER_ROW) as u16;
        let col = (idx % CARDS_PER_ROW) as u16;
        let card_area = Rect {
            x: area.x + col * card_width,
            y: area.y + row * CARD_HEIGHT,
            width: card_width,
            height: CARD_HEIGHT,
        };
        render_card(frame, card_area, view, &app.cfg);
    }
}

fn render_card(frame: &mut Frame, area: Rect, view: &SlotView, cfg: &BoardConfig) {
    let kind = view.status.as_ref().map(|s| s.kind);
    let border_style = if view.not_found {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(status_color(kind))
    };
    let title = match view.kind {
        SlotKind::Custom => format!("{} (custom)", view.slot_id),
        SlotKind::Api => view.slot_id.clone(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines = card_lines(view, cfg);
    let body = Paragraph::new(lines).block(block);
    frame.render_widget(body, area);
}

fn card_lines(view: &SlotView, cfg: &BoardConfig) -> Vec<Line<'static>> {
    let offset = cfg.display_offset;
    if view.not_found {
        return vec![Line::styled(
            "Match not found",
            Style::default().fg(Color::DarkGray),
        )];
    }

    let status_line = match view.status.as_ref() {
        Some(status) => Line::styled(
            status.text.clone(),
            Style::default()
                .fg(status_color(Some(status.kind)))
                .add_modifier(Modifier::BOLD),
        ),
        None => Line::raw("--"),
    };

    let Some(record) = view.record.as_ref() else {
        return vec![status_line];
    };

    let mut lines = vec![
        Line::raw(format!("{} vs {}", record.home, record.away)),
        status_line,
        Line::raw(record.score_line(offset)),
        Line::styled(
            format!(
                "{} · {} · {}",
                record.status_label(),
                record.competition_display_name(),
                record.round_label()
            ),
            Style::default().fg(Color::Gray),
        ),
    ];
    if let Some(kickoff) = record.utc_kickoff {
        let start = kickoff_local(kickoff, offset);
        let end = kickoff_local(implied_end(kickoff, cfg.match_duration), offset);
        lines.push(Line::styled(
            format!("KO {} · ends ~{}", start.format("%H:%M"), end.format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines
}

fn status_color(kind: Option<StatusKind>) -> Color {
    match kind {
        Some(StatusKind::Live) | Some(StatusKind::Starting) => Color::Red,
        Some(StatusKind::Finished) => Color::Gray,
        Some(StatusKind::Scheduled) => Color::Yellow,
        Some(StatusKind::Unknown) | None => Color::DarkGray,
    }
}

fn render_console(frame: &mut Frame, area: Rect, board: &SlotBoard) {
    let visible = area.height.saturating_sub(1) as usize;
    let skip = board.logs.len().saturating_sub(visible);
    let text = board
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let console = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().title("Console").borders(Borders::TOP));
    frame.render_widget(console, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(50, 40, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Matchday Board - Help",
        "",
        "  c            Toggle console",
        "  ?            Toggle help",
        "  q / Esc      Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
