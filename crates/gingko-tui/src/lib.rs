// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{SetTitle, disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use gingko_app::{
    CardId, CloseDecision, ClosePhase, ClosePrompt, Collaborators, DecisionSurface, Editor,
    EditorCommand, EditorEvent, EventQueue, Mode, Persistence, TitleSink,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const INDENT: &str = "  ";
const CURSOR: &str = "▏";
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const POLL_INTERVAL: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TuiOptions {
    /// Answer every close prompt with this decision instead of showing the
    /// overlay.
    pub auto_decision: Option<CloseDecision>,
}

/// Which key map is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Navigation,
    Edit,
    Decision,
}

impl View {
    pub fn of(editor: &Editor) -> Self {
        if editor.close_phase() == ClosePhase::AwaitingDecision {
            return Self::Decision;
        }
        match editor.mode() {
            Mode::Navigation => Self::Navigation,
            Mode::Edit => Self::Edit,
        }
    }
}

/// Buffers title changes until the draw loop can write them to the
/// terminal.
#[derive(Debug, Default)]
pub struct TerminalTitle {
    current: String,
    pending: Option<String>,
}

impl TerminalTitle {
    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn flush(&mut self, out: &mut impl Write) -> Result<()> {
        if let Some(title) = self.pending.take() {
            execute!(out, SetTitle(&title)).context("set terminal title")?;
        }
        Ok(())
    }
}

impl TitleSink for TerminalTitle {
    fn set_title(&mut self, title: &str) {
        if self.current != title {
            self.current = title.to_owned();
            self.pending = Some(self.current.clone());
        }
    }
}

/// Close prompt drawn over the tree. Answers arrive later as key presses
/// unless an automatic decision is configured.
#[derive(Debug, Default)]
pub struct DecisionOverlay {
    auto: Option<CloseDecision>,
    prompt: Option<ClosePrompt>,
}

impl DecisionOverlay {
    pub fn new(auto: Option<CloseDecision>) -> Self {
        Self { auto, prompt: None }
    }

    pub fn prompt(&self) -> Option<&ClosePrompt> {
        self.prompt.as_ref()
    }

    fn dismiss(&mut self) {
        self.prompt = None;
    }
}

impl DecisionSurface for DecisionOverlay {
    fn present(&mut self, prompt: &ClosePrompt) -> Option<CloseDecision> {
        if let Some(decision) = self.auto {
            info!(decision = decision.as_str(), "close prompt answered automatically");
            return Some(decision);
        }
        self.prompt = Some(prompt.clone());
        None
    }
}

#[derive(Debug)]
enum InternalEvent {
    ClearStatus { token: u64 },
}

struct Session<'a> {
    editor: &'a mut Editor,
    persistence: &'a mut dyn Persistence,
    queue: EventQueue,
    title: TerminalTitle,
    overlay: DecisionOverlay,
    status_token: u64,
}

impl Session<'_> {
    fn submit(&mut self, command: EditorCommand, internal_tx: &Sender<InternalEvent>) {
        self.queue.push(command);
        let mut collaborators = Collaborators {
            persistence: &mut *self.persistence,
            title: &mut self.title,
            decisions: &mut self.overlay,
        };
        let events = self.queue.drain(self.editor, &mut collaborators);
        self.after_events(&events, internal_tx);
    }

    fn after_events(&mut self, events: &[EditorEvent], internal_tx: &Sender<InternalEvent>) {
        for event in events {
            match event {
                EditorEvent::StatusUpdated(_) => {
                    self.status_token = self.status_token.saturating_add(1);
                    schedule_status_clear(internal_tx, self.status_token);
                }
                EditorEvent::CloseAborted | EditorEvent::Closing => self.overlay.dismiss(),
                _ => {}
            }
        }
        if self.editor.close_phase() == ClosePhase::Idle {
            self.overlay.dismiss();
        }
    }

    fn process_internal_events(
        &mut self,
        internal_tx: &Sender<InternalEvent>,
        internal_rx: &Receiver<InternalEvent>,
    ) {
        while let Ok(event) = internal_rx.try_recv() {
            match event {
                InternalEvent::ClearStatus { token } if token == self.status_token => {
                    self.submit(EditorCommand::ClearStatus, internal_tx);
                }
                InternalEvent::ClearStatus { .. } => {}
            }
        }
    }
}

pub fn run_app(
    editor: &mut Editor,
    persistence: &mut dyn Persistence,
    options: &TuiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let result = run_in_terminal(editor, persistence, options);
    let restored = restore_terminal();
    result.and(restored)
}

fn run_in_terminal(
    editor: &mut Editor,
    persistence: &mut dyn Persistence,
    options: &TuiOptions,
) -> Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut session = Session {
        editor,
        persistence,
        queue: EventQueue::default(),
        title: TerminalTitle::default(),
        overlay: DecisionOverlay::new(options.auto_decision),
        status_token: 0,
    };
    let initial_title = session.editor.title();
    session.title.set_title(&initial_title);

    event_loop(&mut terminal, &mut session, &mut io::stdout(), next_terminal_event)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    Ok(())
}

fn next_terminal_event() -> Result<Option<Event>> {
    if !event::poll(POLL_INTERVAL).context("poll event")? {
        return Ok(None);
    }
    event::read().map(Some).context("read event")
}

/// Draws and dispatches until the editor starts closing. Any error ends the
/// loop so the caller can restore the terminal.
fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    session: &mut Session<'_>,
    title_out: &mut impl Write,
    mut next_event: impl FnMut() -> Result<Option<Event>>,
) -> Result<()> {
    let (internal_tx, internal_rx) = mpsc::channel();
    while !session.editor.is_closing() {
        session.process_internal_events(&internal_tx, &internal_rx);
        session.title.flush(title_out)?;
        terminal
            .draw(|frame| render(frame, session.editor, session.overlay.prompt()))
            .context("draw frame")?;

        if let Some(Event::Key(key)) = next_event()? {
            handle_key_event(session, &internal_tx, key);
        }
    }
    Ok(())
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn handle_key_event(
    session: &mut Session<'_>,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.kind == KeyEventKind::Release {
        return;
    }
    let view = View::of(session.editor);
    let Some(command) = command_for_key(view, key) else {
        return;
    };
    debug!(?view, ?command, "key mapped");
    session.submit(command, internal_tx);
}

pub fn command_for_key(view: View, key: KeyEvent) -> Option<EditorCommand> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match view {
        View::Decision => match key.code {
            KeyCode::Char('s') => Some(EditorCommand::Decide(CloseDecision::Save)),
            KeyCode::Char('d') => Some(EditorCommand::Decide(CloseDecision::Discard)),
            KeyCode::Char('c') | KeyCode::Esc => {
                Some(EditorCommand::Decide(CloseDecision::Cancel))
            }
            _ => None,
        },
        View::Edit => match key.code {
            KeyCode::Enter if ctrl => Some(EditorCommand::CommitEdit),
            KeyCode::Esc => Some(EditorCommand::CommitEdit),
            KeyCode::Char('q') if ctrl => Some(EditorCommand::RequestClose),
            KeyCode::Char('s') if ctrl => Some(EditorCommand::Save),
            KeyCode::Enter => Some(EditorCommand::InsertText("\n".to_owned())),
            KeyCode::Backspace => Some(EditorCommand::DeleteBackward),
            KeyCode::Char(ch) if !ctrl => Some(EditorCommand::InsertText(ch.to_string())),
            _ => None,
        },
        View::Navigation => match key.code {
            KeyCode::Char('q') if ctrl => Some(EditorCommand::RequestClose),
            KeyCode::Char('s') if ctrl => Some(EditorCommand::Save),
            KeyCode::Char('l') if ctrl => Some(EditorCommand::InsertChild),
            KeyCode::Char('j') if ctrl => Some(EditorCommand::InsertBelow),
            KeyCode::Char('k') if ctrl => Some(EditorCommand::InsertAbove),
            KeyCode::Char('d') if ctrl => Some(EditorCommand::DeleteCard),
            KeyCode::Enter => Some(EditorCommand::EnterEdit),
            KeyCode::Char('k') | KeyCode::Up => Some(EditorCommand::FocusUp),
            KeyCode::Char('j') | KeyCode::Down => Some(EditorCommand::FocusDown),
            KeyCode::Char('h') | KeyCode::Left => Some(EditorCommand::FocusLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(EditorCommand::FocusRight),
            _ => None,
        },
    }
}

fn render(frame: &mut ratatui::Frame<'_>, editor: &Editor, prompt: Option<&ClosePrompt>) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(editor))
        .block(Block::default().title("gingko").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let focused = editor.focused_id();
    let lines = tree_lines(editor)
        .into_iter()
        .map(|(card, text)| {
            if card == focused {
                Line::styled(
                    text,
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Line::raw(text)
            }
        })
        .collect::<Vec<_>>();
    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(focused_selector(editor)),
    );
    frame.render_widget(body, layout[1]);

    let status = Paragraph::new(status_text(editor))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(prompt) = prompt {
        let area = centered_rect(60, 30, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(decision_overlay_text(prompt))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("unsaved changes")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::White)),
            );
        frame.render_widget(overlay, area);
    }
}

fn header_text(editor: &Editor) -> String {
    format!("{}  [{}]", editor.title(), editor.mode().as_str())
}

fn focused_selector(editor: &Editor) -> String {
    match editor.buffer() {
        Some(buffer) => buffer.selector(),
        None => editor.focused_id().view_selector(),
    }
}

/// One display line per card, indented by depth. The card under edit shows
/// its buffer instead of its committed content.
fn tree_lines(editor: &Editor) -> Vec<(CardId, String)> {
    let store = editor.store();
    store
        .walk()
        .into_iter()
        .map(|(card, depth)| {
            let indent = INDENT.repeat(depth);
            let text = match editor.buffer() {
                Some(buffer) if buffer.card_id() == card => {
                    format!("{}{CURSOR}", buffer.text().replace('\n', " / "))
                }
                _ => store
                    .content(card)
                    .map(|content| content.replace('\n', " / "))
                    .unwrap_or_default(),
            };
            let marker = if card == editor.focused_id() { ">" } else { " " };
            (card, format!("{marker} {indent}{text}"))
        })
        .collect()
}

fn status_text(editor: &Editor) -> String {
    if let Some(message) = editor.status_line() {
        return message.to_owned();
    }
    match View::of(editor) {
        View::Navigation => {
            "enter edit | hjkl move | ^l child ^j below ^k above | ^d delete | ^s save | ^q quit"
                .to_owned()
        }
        View::Edit => "type to edit | backspace delete | ctrl+enter/esc commit".to_owned(),
        View::Decision => "s save | d discard | c cancel".to_owned(),
    }
}

const fn decision_key(decision: CloseDecision) -> char {
    match decision {
        CloseDecision::Save => 's',
        CloseDecision::Discard => 'd',
        CloseDecision::Cancel => 'c',
    }
}

fn decision_overlay_text(prompt: &ClosePrompt) -> String {
    let choices = prompt
        .choices
        .iter()
        .map(|choice| format!("[{}] {}", decision_key(*choice), choice.label()))
        .collect::<Vec<_>>()
        .join("   ");
    format!("{}\n\n{choices}", prompt.message)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
