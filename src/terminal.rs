use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use birdle_rs::game_over::{GameSummary, SummaryAction};
use birdle_rs::session::Event;
use birdle_rs::ui::{Anchor, Clipboard, ClipboardError, FocusTarget, GameView, Key, Notifier};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event as TermEvent, KeyCode, KeyEvent,
    KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{
    self, BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{cursor, execute, queue};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use termimad::{FmtText, MadSkin};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

const TOAST_DURATION: Duration = Duration::from_secs(2);
const MODAL_DURATION: Duration = Duration::from_secs(2);
const INPUT_POLL: Duration = Duration::from_millis(100);
const HEADER_ROWS: usize = 2;
const HELP: &str = "Enter: guess  Up/Down: choose  Esc: close list  Ctrl+C: quit";

/// Everything currently on screen.
#[derive(Debug, Default)]
struct Screen {
    guesses: Vec<String>,
    input: String,
    suggestions: Vec<String>,
    highlighted: Option<usize>,
    hint_visible: bool,
    hint_bouncing: bool,
    hint_panel: Option<(String, String)>,
    popover: Option<(String, String)>,
    toast: Option<(u64, String)>,
    toast_seq: u64,
    modal: Option<(String, String)>,
    summary: Option<GameSummary>,
    disabled: Option<String>,
}

#[derive(Debug, Eq, PartialEq)]
struct Line {
    text: String,
    highlight: bool,
}

impl Line {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlight: false,
        }
    }
}

impl Screen {
    fn suggestions_top(&self) -> usize {
        HEADER_ROWS + self.guesses.len() + 1
    }

    fn suggestion_at(&self, row: u16) -> Option<usize> {
        let index = (row as usize).checked_sub(self.suggestions_top())?;
        (index < self.suggestions.len()).then_some(index)
    }

    fn layout(&self, width: usize) -> Vec<Line> {
        let mut lines = Vec::new();
        let marker = match (self.hint_visible, self.hint_bouncing) {
            (false, _) => "",
            (true, false) => "  [?]",
            (true, true) => "  [?]!",
        };
        lines.push(Line::plain(format!("Birdle{marker}")));
        lines.push(Line::plain(""));
        for (number, guess) in self.guesses.iter().enumerate() {
            lines.push(Line::plain(format!("{}. {guess}", number + 1)));
        }
        match &self.disabled {
            Some(placeholder) => lines.push(Line::plain(format!("  {placeholder}"))),
            None => lines.push(Line::plain(format!("> {}_", self.input))),
        }
        for (index, label) in self.suggestions.iter().enumerate() {
            lines.push(Line {
                text: format!("  {label}"),
                highlight: self.highlighted == Some(index),
            });
        }
        lines.push(Line::plain(""));
        if let Some((title, message)) = &self.hint_panel {
            lines.push(Line::plain(format!("Hint: {title}")));
            lines.push(Line::plain(format!("  {message}")));
        }
        if let Some((title, message)) = &self.popover {
            lines.push(Line::plain(format!("{title}: {message}")));
            lines.push(Line::plain("  [y] take the hint  [n] not now"));
        }
        if let Some((_, text)) = &self.toast {
            lines.push(Line::plain(format!("* {text}")));
        }
        if let Some((title, text)) = &self.modal {
            lines.push(Line::plain(format!("== {title} ==")));
            lines.push(Line::plain(text.clone()));
        }
        if let Some(summary) = &self.summary {
            let markdown = format!("# {}\n\n{}\n\n{}", summary.title, summary.message, summary.emojis);
            let skin = MadSkin::default();
            let rendered = FmtText::from(&skin, &markdown, Some(width.max(20))).to_string();
            lines.extend(rendered.lines().map(Line::plain));
            lines.push(Line::plain("[c] copy results  [q] close"));
        }
        lines.push(Line::plain(""));
        lines.push(Line::plain(HELP));
        lines
    }
}

fn draw(screen: &Screen) -> io::Result<()> {
    let (cols, rows) = terminal::size()?;
    let lines = screen.layout(cols as usize);
    let mut out = io::stdout().lock();
    queue!(out, BeginSynchronizedUpdate, Clear(ClearType::All))?;
    for (row, line) in lines.iter().take(rows as usize).enumerate() {
        queue!(out, cursor::MoveTo(0, row as u16))?;
        if line.highlight {
            queue!(
                out,
                SetAttribute(Attribute::Reverse),
                Print(&line.text),
                SetAttribute(Attribute::Reset)
            )?;
        } else {
            queue!(out, Print(&line.text))?;
        }
    }
    queue!(out, EndSynchronizedUpdate)?;
    out.flush()
}

/// Guess rows arrive as HTML fragments; the terminal shows their text.
fn strip_tags(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut in_tag = false;
    for ch in markup.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn osc52(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// Maps a key press to a game event. Typing edits the input line in place.
fn translate(screen: &mut Screen, key: KeyEvent) -> Option<Event> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Event::Quit);
    }
    if screen.modal.is_some() {
        return None;
    }
    if screen.popover.is_some() {
        match key.code {
            KeyCode::Char('y') => return Some(Event::HintAccepted),
            KeyCode::Char('n') | KeyCode::Esc => return Some(Event::HintDeclined),
            _ => {}
        }
    }
    if screen.summary.is_some() {
        return match key.code {
            KeyCode::Char('c') => Some(Event::Summary(SummaryAction::CopyResults)),
            KeyCode::Char('q') | KeyCode::Esc => Some(Event::Summary(SummaryAction::Close)),
            _ => None,
        };
    }
    if screen.disabled.is_some() {
        return matches!(key.code, KeyCode::Char('q') | KeyCode::Esc).then_some(Event::Quit);
    }
    match key.code {
        KeyCode::Char(ch) => {
            screen.input.push(ch);
            Some(Event::Input(screen.input.clone()))
        }
        KeyCode::Backspace => {
            screen.input.pop()?;
            Some(Event::Input(screen.input.clone()))
        }
        KeyCode::Up => Some(Event::KeyDown(Key::ArrowUp)),
        KeyCode::Down => Some(Event::KeyDown(Key::ArrowDown)),
        KeyCode::Enter => Some(Event::KeyDown(Key::Enter)),
        KeyCode::Tab => Some(Event::KeyDown(Key::Tab)),
        KeyCode::Esc => Some(Event::Blur(FocusTarget::Elsewhere)),
        _ => None,
    }
}

/// Raw mode plus the alternate screen, restored on drop.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), DisableMouseCapture, cursor::Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Terminal front end for a game session. Clones share one screen.
#[derive(Clone)]
pub struct TerminalUi {
    screen: Arc<Mutex<Screen>>,
    events: UnboundedSender<Event>,
    attached: bool,
}

impl TerminalUi {
    pub fn new(events: UnboundedSender<Event>) -> Self {
        Self {
            screen: Arc::new(Mutex::new(Screen::default())),
            events,
            attached: true,
        }
    }

    /// Blank screen for the next page load.
    pub fn reset(&self) {
        self.update(|screen| *screen = Screen::default());
    }

    fn update(&self, apply: impl FnOnce(&mut Screen)) {
        let mut screen = self.screen.lock();
        apply(&mut screen);
        if self.attached {
            if let Err(err) = draw(&screen) {
                warn!(error = %err, "failed to draw screen");
            }
        }
    }

    fn after(&self, delay: Duration, then: impl FnOnce(&TerminalUi) + Send + 'static) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no runtime to schedule screen update on");
            return;
        };
        let ui = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            then(&ui);
        });
    }
}

impl GameView for TerminalUi {
    fn append_guess(&mut self, markup: &str) {
        let text = strip_tags(markup);
        self.update(|screen| screen.guesses.push(text));
    }

    fn set_input_value(&mut self, value: &str) {
        self.update(|screen| screen.input = value.to_string());
    }

    fn render_suggestions(&mut self, labels: &[String]) {
        self.update(|screen| {
            screen.suggestions = labels.to_vec();
            screen.highlighted = None;
        });
    }

    fn clear_suggestions(&mut self) {
        self.update(|screen| {
            screen.suggestions.clear();
            screen.highlighted = None;
        });
    }

    fn highlight_suggestion(&mut self, index: Option<usize>) {
        self.update(|screen| screen.highlighted = index);
    }

    // Every suggestion row is always drawn.
    fn scroll_suggestion_into_view(&mut self, _index: usize) {}

    fn show_hint_affordance(&mut self) {
        self.update(|screen| screen.hint_visible = true);
    }

    fn set_hint_bouncing(&mut self, bouncing: bool) {
        self.update(|screen| screen.hint_bouncing = bouncing);
    }

    fn show_hint_panel(&mut self, title: &str, message: &str) {
        self.update(|screen| screen.hint_panel = Some((title.to_string(), message.to_string())));
    }

    fn show_summary(&mut self, summary: &GameSummary) {
        self.update(|screen| screen.summary = Some(summary.clone()));
    }

    fn close_summary(&mut self) {
        self.update(|screen| screen.summary = None);
    }

    fn disable_controls(&mut self, placeholder: &str) {
        self.update(|screen| {
            screen.input.clear();
            screen.disabled = Some(placeholder.to_string());
        });
    }
}

impl Notifier for TerminalUi {
    fn notify_transient(&mut self, text: &str) {
        let mut id = 0;
        self.update(|screen| {
            screen.toast_seq += 1;
            id = screen.toast_seq;
            screen.toast = Some((id, text.to_string()));
        });
        self.after(TOAST_DURATION, move |ui| {
            ui.update(|screen| {
                if matches!(screen.toast, Some((current, _)) if current == id) {
                    screen.toast = None;
                }
            });
        });
    }

    fn notify_blocking(&mut self, title: &str, text: &str, on_dismiss: Event) {
        self.update(|screen| screen.modal = Some((title.to_string(), text.to_string())));
        self.after(MODAL_DURATION, move |ui| {
            ui.update(|screen| screen.modal = None);
            let _ = ui.events.send(on_dismiss);
        });
    }

    fn show_detail(&mut self, _anchor: Anchor, title: &str, message: &str) {
        self.update(|screen| screen.popover = Some((title.to_string(), message.to_string())));
    }

    fn hide_detail(&mut self, _anchor: Anchor) {
        self.update(|screen| screen.popover = None);
    }
}

impl Clipboard for TerminalUi {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if !self.attached {
            return Err(ClipboardError::Unavailable);
        }
        let mut out = io::stdout().lock();
        out.write_all(osc52(text).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// Reads terminal input on its own thread and forwards game events.
pub struct InputThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputThread {
    pub fn spawn(ui: &TerminalUi) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let screen = Arc::clone(&ui.screen);
        let events = ui.events.clone();
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || input_loop(screen, events, flag));
        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn input_loop(screen: Arc<Mutex<Screen>>, events: UnboundedSender<Event>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        match event::poll(INPUT_POLL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                warn!(error = %err, "terminal input failed");
                break;
            }
        }
        let incoming = match event::read() {
            Ok(incoming) => incoming,
            Err(err) => {
                warn!(error = %err, "terminal input failed");
                break;
            }
        };
        let mut current = screen.lock();
        let outgoing = match incoming {
            TermEvent::Key(key) if key.kind == KeyEventKind::Press => translate(&mut current, key),
            TermEvent::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                current.suggestion_at(mouse.row).map(Event::SuggestionClicked)
            }
            _ => None,
        };
        if let Err(err) = draw(&current) {
            warn!(error = %err, "failed to draw screen");
        }
        drop(current);
        if let Some(event) = outgoing {
            if events.send(event).is_err() {
                break;
            }
        }
    }
}
