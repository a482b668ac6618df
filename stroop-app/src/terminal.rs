use std::collections::VecDeque;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use stroop_experiment::{Display, Element, FeedbackKind, InfoOutcome, InfoScreen, Keyboard};
use stroop_timing::{HighPrecisionTimer, Timer};

use crate::messages::Messages;
use crate::trials::ColoredWord;

/// Terminal colour for an ink name used in trial files.
pub fn ink(name: &str) -> Option<Color> {
    let color = match name.to_ascii_lowercase().as_str() {
        "red" => Color::Red,
        "green" => Color::Green,
        "blue" => Color::Blue,
        "yellow" => Color::Yellow,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "black" => Color::Black,
        "grey" | "gray" => Color::Grey,
        _ => return None,
    };
    Some(color)
}

/// Parses a key name such as `f7`, `escape` or `q`.
pub fn parse_key(name: &str) -> Option<KeyCode> {
    let name = name.trim().to_ascii_lowercase();
    match name.as_str() {
        "esc" | "escape" => return Some(KeyCode::Esc),
        "space" => return Some(KeyCode::Char(' ')),
        _ => {}
    }
    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        return (1..=12).contains(&n).then_some(KeyCode::F(n));
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeyCode::Char(c)),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct Scene {
    fixation: bool,
    stimuli: Vec<ColoredWord>,
    labels: Option<String>,
    feedback: Option<FeedbackKind>,
}

/// Full-screen text frontend. Frames are paced on the session timer; input is
/// only read while the terminal is attached in raw mode.
pub struct TerminalFrontend<W: Write> {
    out: W,
    timer: HighPrecisionTimer,
    frame: Duration,
    last_flip: Option<u64>,
    scene: Scene,
    abort_key: KeyCode,
    abort_seen: bool,
    pending: VecDeque<char>,
    attached: bool,
    messages: Messages,
}

impl TerminalFrontend<Stdout> {
    /// Takes over the terminal until dropped.
    pub fn stdout(
        timer: HighPrecisionTimer,
        frame: Duration,
        abort_key: KeyCode,
    ) -> io::Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, Hide)?;
        let mut frontend = Self::new(out, timer, frame, abort_key);
        frontend.attached = true;
        Ok(frontend)
    }
}

impl<W: Write> TerminalFrontend<W> {
    pub fn new(out: W, timer: HighPrecisionTimer, frame: Duration, abort_key: KeyCode) -> Self {
        Self {
            out,
            timer,
            frame,
            last_flip: None,
            scene: Scene::default(),
            abort_key,
            abort_seen: false,
            pending: VecDeque::new(),
            attached: false,
            messages: Messages::default(),
        }
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    fn pump(&mut self) -> io::Result<()> {
        if !self.attached {
            return Ok(());
        }
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                self.on_key(key);
            }
        }
        Ok(())
    }

    fn pump_or_log(&mut self) {
        if let Err(err) = self.pump() {
            tracing::warn!(error = %err, "failed to read terminal input");
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.is_abort(&key) {
            self.abort_seen = true;
            return;
        }
        if let KeyCode::Char(c) = key.code {
            self.pending.push_back(c.to_ascii_lowercase());
        }
    }

    fn is_abort(&self, key: &KeyEvent) -> bool {
        key.code == self.abort_key
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    }

    fn wait_for_frame(&self) {
        if let Some(last) = self.last_flip {
            let since = self.timer.elapsed(last);
            if since < self.frame {
                self.timer.sleep(self.frame - since);
            }
        }
    }

    fn draw(&mut self) -> io::Result<()> {
        let (cols, rows) = terminal::size().unwrap_or((80, 24));
        let mid = rows / 2;
        queue!(self.out, Clear(ClearType::All))?;

        if self.scene.fixation {
            centered(&mut self.out, cols, mid, "+", Color::White)?;
        }
        for (i, word) in self.scene.stimuli.iter().enumerate() {
            let color = ink(&word.color).unwrap_or(Color::White);
            centered(&mut self.out, cols, mid + i as u16, &word.text, color)?;
        }
        if let Some(labels) = &self.scene.labels {
            centered(&mut self.out, cols, rows.saturating_sub(3), labels, Color::White)?;
        }
        if let Some(kind) = self.scene.feedback {
            centered(&mut self.out, cols, mid, kind.default_text(), Color::White)?;
        }
        queue!(self.out, ResetColor)?;
        self.out.flush()
    }

    fn draw_text(&mut self, text: &str) -> io::Result<()> {
        let (cols, rows) = terminal::size().unwrap_or((80, 24));
        let lines: Vec<&str> = text.lines().collect();
        let top = (rows / 2).saturating_sub(lines.len() as u16 / 2);
        queue!(self.out, Clear(ClearType::All))?;
        for (i, line) in lines.iter().enumerate() {
            centered(&mut self.out, cols, top + i as u16, line, Color::White)?;
        }
        queue!(self.out, ResetColor)?;
        self.out.flush()
    }
}

fn centered<W: Write>(
    out: &mut W,
    cols: u16,
    row: u16,
    text: &str,
    color: Color,
) -> io::Result<()> {
    let width = text.chars().count() as u16;
    let col = cols.saturating_sub(width) / 2;
    queue!(out, MoveTo(col, row), SetForegroundColor(color), Print(text))
}

impl<W: Write> Display for TerminalFrontend<W> {
    type Stimulus = ColoredWord;

    fn set_visible(&mut self, element: Element<'_, ColoredWord>, visible: bool) -> io::Result<()> {
        match element {
            Element::Fixation => self.scene.fixation = visible,
            Element::Stimuli(words) => {
                self.scene.stimuli = if visible { words.to_vec() } else { Vec::new() };
            }
            Element::KeyLabels(labels) => {
                self.scene.labels = visible.then(|| labels.to_string());
            }
            Element::Feedback(kind) => self.scene.feedback = visible.then_some(kind),
        }
        Ok(())
    }

    fn flip_with(&mut self, on_flip: &mut dyn FnMut()) -> io::Result<()> {
        self.wait_for_frame();
        self.draw()?;
        self.last_flip = Some(self.timer.now());
        on_flip();
        Ok(())
    }

    fn show_info(&mut self, screen: InfoScreen, insert: &str) -> io::Result<InfoOutcome> {
        let text = self.messages.text(screen, insert);
        self.draw_text(&text)?;
        self.last_flip = None;
        if !self.attached {
            return Ok(InfoOutcome::Continue);
        }
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if self.is_abort(&key) {
                self.abort_seen = true;
                return Ok(InfoOutcome::Abort);
            }
            if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
                self.pending.clear();
                return Ok(InfoOutcome::Continue);
            }
        }
    }
}

impl<W: Write> Keyboard for TerminalFrontend<W> {
    fn clear_events(&mut self) {
        self.pump_or_log();
        self.pending.clear();
    }

    fn poll_key(&mut self, valid: &[char]) -> Option<char> {
        self.pump_or_log();
        while let Some(c) = self.pending.pop_front() {
            if valid.contains(&c) {
                return Some(c);
            }
        }
        None
    }

    fn abort_requested(&mut self) -> bool {
        self.pump_or_log();
        self.abort_seen
    }
}

impl<W: Write> Drop for TerminalFrontend<W> {
    fn drop(&mut self) {
        if self.attached {
            let _ = execute!(self.out, ResetColor, Show, LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        }
    }
}
