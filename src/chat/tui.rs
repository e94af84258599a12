use super::session::{is_chat_exit_command, ChatMessage, ChatSession, NodeView, Speaker};
use crate::collection::StepKind;
use crate::intent::{Debouncer, IntentError, RequestSequencer, RequestToken, Suggestion};
use crate::status::NodeStatus;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use serde_json::json;
use std::io::{self, BufRead, Stdout, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

const UI_POLL_INTERVAL: Duration = Duration::from_millis(60);
const CURSOR_BLINK_INTERVAL: Duration = Duration::from_millis(500);
const SUGGESTION_LIMIT: usize = 5;

type SuggestionResult = (RequestToken, Result<Vec<Suggestion>, IntentError>);

struct TuiState {
    input: String,
    transcript: Vec<ChatMessage>,
    suggestions: Vec<Suggestion>,
    sequencer: RequestSequencer,
    debouncer: Debouncer,
    suggestion_tx: Sender<SuggestionResult>,
    suggestion_rx: Receiver<SuggestionResult>,
    cursor_visible: bool,
    last_cursor_tick: Instant,
}

impl TuiState {
    fn new(debounce: Duration) -> Self {
        let (suggestion_tx, suggestion_rx) = mpsc::channel();
        Self {
            input: String::new(),
            transcript: Vec::new(),
            suggestions: Vec::new(),
            sequencer: RequestSequencer::new(),
            debouncer: Debouncer::new(debounce),
            suggestion_tx,
            suggestion_rx,
            cursor_visible: true,
            last_cursor_tick: Instant::now(),
        }
    }

    fn status_line(&self, session: &ChatSession) -> String {
        if !self.suggestions.is_empty() {
            let names = self
                .suggestions
                .iter()
                .map(|suggestion| suggestion.name.as_str())
                .collect::<Vec<_>>()
                .join(" | ");
            return format!("suggestions (Tab to accept): {names}");
        }
        match session.current_step() {
            Some(step) if step.can_skip => {
                "optional field: answer or type `skip`; /help for commands".to_string()
            }
            Some(_) => "enter text and press Enter; /help for commands, /exit to quit".to_string(),
            None => "pipeline configured; /export to print it, /exit to quit".to_string(),
        }
    }

    fn advance_cursor_blink_if_needed(&mut self) {
        if self.last_cursor_tick.elapsed() >= CURSOR_BLINK_INTERVAL {
            self.cursor_visible = !self.cursor_visible;
            self.last_cursor_tick = Instant::now();
        }
    }

    fn cursor_suffix(&self) -> &'static str {
        if self.cursor_visible {
            "█"
        } else {
            " "
        }
    }

    fn accept_suggestion(&mut self) {
        if let Some(first) = self.suggestions.first() {
            self.input = first.name.clone();
            self.suggestions.clear();
        }
    }

    fn on_input_changed(&mut self) {
        self.suggestions.clear();
        self.debouncer.touch(Instant::now());
    }
}

pub fn run_chat_session_tui(mut session: ChatSession, debounce: Duration) -> Result<(), String> {
    let mut terminal = setup_terminal()?;
    let mut state = TuiState::new(debounce);
    state.transcript.extend(session.opening_messages());

    let result = run_event_loop(&mut terminal, &mut session, &mut state);
    teardown_terminal(&mut terminal)?;

    result
}

/// Plain line-oriented chat for pipes and scripts.
pub fn run_chat_session_lines<R: BufRead, W: Write>(
    session: &mut ChatSession,
    input: R,
    mut output: W,
) -> Result<(), String> {
    let mut write_messages = |messages: Vec<ChatMessage>| -> Result<(), String> {
        for message in messages {
            writeln!(output, "{}> {}", message.speaker.label(), message.text)
                .map_err(|e| format!("failed to write chat output: {e}"))?;
        }
        Ok(())
    };

    write_messages(session.opening_messages())?;
    for line in input.lines() {
        let line = line.map_err(|e| format!("failed to read chat input: {e}"))?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if is_chat_exit_command(message) {
            break;
        }
        write_messages(session.handle_message(message))?;
    }
    Ok(())
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut ChatSession,
    state: &mut TuiState,
) -> Result<(), String> {
    loop {
        state.advance_cursor_blink_if_needed();
        request_suggestions_if_settled(session, state);
        check_suggestion_results(session, state);
        draw_chat_ui(terminal, session, state)?;

        if !event::poll(UI_POLL_INTERVAL).map_err(|e| format!("failed to poll events: {e}"))? {
            continue;
        }

        let Event::Key(key) = event::read().map_err(|e| format!("failed to read event: {e}"))?
        else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            break;
        }

        match key.code {
            KeyCode::Esc => break,
            KeyCode::Tab => state.accept_suggestion(),
            KeyCode::Enter => {
                let message = state.input.trim().to_string();
                state.input.clear();
                state.suggestions.clear();
                if message.is_empty() {
                    continue;
                }
                if is_chat_exit_command(&message) {
                    break;
                }
                state.transcript.push(ChatMessage {
                    speaker: Speaker::User,
                    text: message.clone(),
                });
                state.transcript.extend(session.handle_message(&message));
                state.cursor_visible = true;
                state.last_cursor_tick = Instant::now();
            }
            KeyCode::Backspace => {
                state.input.pop();
                state.on_input_changed();
            }
            KeyCode::Char(c) => {
                state.input.push(c);
                state.on_input_changed();
            }
            _ => {}
        }
    }

    Ok(())
}

/// Autocomplete only helps while a node name is being asked for.
fn request_suggestions_if_settled(session: &ChatSession, state: &mut TuiState) {
    if !state.debouncer.take_settled(Instant::now()) {
        return;
    }
    let partial = state.input.trim().to_string();
    let asking_for_name = session
        .current_step()
        .is_some_and(|step| step.kind == StepKind::NodeName);
    if partial.is_empty() || partial.starts_with('/') || !asking_for_name {
        return;
    }

    let token = state.sequencer.issue();
    let parser = session.intent_parser();
    let tx = state.suggestion_tx.clone();
    thread::spawn(move || {
        let result = parser.suggest(&partial, SUGGESTION_LIMIT);
        let _ = tx.send((token, result));
    });
}

fn check_suggestion_results(session: &ChatSession, state: &mut TuiState) {
    while let Ok((token, result)) = state.suggestion_rx.try_recv() {
        if !state.sequencer.accept(token) {
            session
                .log()
                .info("intent_stale_discarded", &[("operation", json!("suggest"))]);
            continue;
        }
        match result {
            Ok(suggestions) => state.suggestions = suggestions,
            Err(err) => {
                state.suggestions.clear();
                session
                    .log()
                    .warn("intent_suggest_failed", &[("error", json!(err.to_string()))]);
            }
        }
    }
}

fn status_color(status: NodeStatus) -> Color {
    match status {
        NodeStatus::Pending => Color::Gray,
        NodeStatus::Partial => Color::Yellow,
        NodeStatus::Complete => Color::Green,
        NodeStatus::Error => Color::Red,
    }
}

fn node_widget(node: &NodeView) -> Paragraph<'static> {
    let color = status_color(node.status);
    let border = if node.is_active {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(color)
    };
    Paragraph::new(vec![
        Line::raw(node.name.clone()),
        Line::styled(
            format!(
                "{} {}/{}",
                node.status, node.mandatory_filled, node.mandatory_total
            ),
            Style::default().fg(color),
        ),
    ])
    .block(
        Block::default()
            .title(node.role.as_str())
            .borders(Borders::ALL)
            .border_style(border),
    )
}

fn draw_chat_ui(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &ChatSession,
    state: &TuiState,
) -> Result<(), String> {
    let progress = session.progress();
    let view = session.canvas_view();
    terminal
        .draw(|frame| {
            let sections = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Length(4),
                    Constraint::Min(8),
                    Constraint::Length(3),
                    Constraint::Length(3),
                ])
                .split(frame.area());

            let header = Paragraph::new(vec![
                Line::raw("Pipewright"),
                Line::raw(format!(
                    "session={} progress={:.0}%",
                    session.session_id(),
                    progress.total
                )),
            ])
            .block(
                Block::default()
                    .title("Session")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            );
            frame.render_widget(header, sections[0]);

            let boxes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Ratio(1, 3),
                    Constraint::Ratio(1, 3),
                    Constraint::Ratio(1, 3),
                ])
                .split(sections[1]);
            for (node, area) in view.nodes.iter().zip(boxes.iter()) {
                frame.render_widget(node_widget(node), *area);
            }

            let transcript = state
                .transcript
                .iter()
                .map(|message| {
                    let color = match message.speaker {
                        Speaker::Assistant => Color::Green,
                        Speaker::User => Color::Yellow,
                        Speaker::System => Color::Gray,
                    };
                    Line::styled(
                        format!("{}> {}", message.speaker.label(), message.text),
                        Style::default().fg(color),
                    )
                })
                .collect::<Vec<_>>();
            let transcript_widget = Paragraph::new(transcript)
                .block(Block::default().title("Transcript").borders(Borders::ALL))
                .wrap(Wrap { trim: false });
            frame.render_widget(transcript_widget, sections[2]);

            let status_widget = Paragraph::new(state.status_line(session)).block(
                Block::default()
                    .title("Status")
                    .borders(Borders::ALL)
                    .border_style(if state.suggestions.is_empty() {
                        Style::default()
                    } else {
                        Style::default()
                            .fg(Color::Magenta)
                            .add_modifier(Modifier::BOLD)
                    }),
            );
            frame.render_widget(status_widget, sections[3]);

            let input_widget =
                Paragraph::new(format!("you> {}{}", state.input, state.cursor_suffix()))
                    .block(Block::default().title("Input").borders(Borders::ALL));
            frame.render_widget(input_widget, sections[4]);
        })
        .map_err(|e| format!("failed to render chat UI: {e}"))?;

    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, String> {
    enable_raw_mode().map_err(|e| format!("failed to enable raw mode: {e}"))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)
        .map_err(|e| format!("failed to enter alternate screen: {e}"))?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| format!("failed to initialize terminal: {e}"))
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), String> {
    disable_raw_mode().map_err(|e| format!("failed to disable raw mode: {e}"))?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)
        .map_err(|e| format!("failed to leave alternate screen: {e}"))?;
    terminal
        .show_cursor()
        .map_err(|e| format!("failed to restore cursor: {e}"))?;
    Ok(())
}
