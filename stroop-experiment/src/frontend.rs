//! Presentation and input collaborators the scheduler drives.
//!
//! Rendering, window management and the actual key source live outside this
//! crate. The scheduler only relies on the operations below, in particular on
//! [`Display::flip_with`] running its callback in lock-step with the frame that
//! makes the new content visible.

use std::io;
use stroop_core::{Response, Stimulus};

/// Screen elements toggled on and off between flips.
#[derive(Debug)]
pub enum Element<'a, S: Stimulus> {
    Fixation,
    Stimuli(&'a [S]),
    /// Colour names under the stimulus, one per response key.
    KeyLabels(&'a str),
    Feedback(FeedbackKind),
}

impl<S: Stimulus> Clone for Element<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Stimulus> Copy for Element<'_, S> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Correct,
    Incorrect,
    NoResponse,
}

impl FeedbackKind {
    pub fn for_response(response: &Response, expected: char) -> Self {
        match response.key() {
            None => FeedbackKind::NoResponse,
            Some(key) if key == expected => FeedbackKind::Correct,
            Some(_) => FeedbackKind::Incorrect,
        }
    }

    pub fn default_text(&self) -> &'static str {
        match self {
            FeedbackKind::Correct => "Poprawna odpowiedź",
            FeedbackKind::Incorrect => "Odpowiedź niepoprawna",
            FeedbackKind::NoResponse => "Nie udzieliłeś odpowiedzi",
        }
    }
}

/// Full-screen messages shown between blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoScreen {
    /// Before training block `n` (1-based).
    Training(usize),
    Instruction,
    /// After experiment block `n` (1-based), never after the last one.
    Break(usize),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoOutcome {
    Continue,
    Abort,
}

pub trait Display {
    type Stimulus: Stimulus;

    /// Marks an element to be drawn (or no longer drawn) from the next flip on.
    fn set_visible(
        &mut self,
        element: Element<'_, Self::Stimulus>,
        visible: bool,
    ) -> io::Result<()>;

    /// Waits for the next frame boundary, presents it, and runs `on_flip`
    /// synchronously with that refresh before returning.
    fn flip_with(&mut self, on_flip: &mut dyn FnMut()) -> io::Result<()>;

    fn flip(&mut self) -> io::Result<()> {
        self.flip_with(&mut || {})
    }

    /// Shows a message screen and blocks until the participant continues or
    /// presses the abort key. `insert` is spliced into the message text.
    fn show_info(&mut self, screen: InfoScreen, insert: &str) -> io::Result<InfoOutcome>;
}

pub trait Keyboard {
    /// Drops any key presses buffered so far.
    fn clear_events(&mut self);

    /// Returns the first buffered press among `valid`, if any.
    fn poll_key(&mut self, valid: &[char]) -> Option<char>;

    /// True once the reserved abort key has been seen.
    fn abort_requested(&mut self) -> bool;
}

/// Everything a session needs from its presentation layer.
pub trait Frontend: Display + Keyboard {}

impl<F: Display + Keyboard> Frontend for F {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn feedback_follows_response() {
        let key = |k| Response::Key {
            key: k,
            reaction_time: Duration::from_millis(500),
        };
        assert_eq!(FeedbackKind::for_response(&key('z'), 'z'), FeedbackKind::Correct);
        assert_eq!(FeedbackKind::for_response(&key('x'), 'z'), FeedbackKind::Incorrect);
        assert_eq!(
            FeedbackKind::for_response(&Response::NoResponse, 'z'),
            FeedbackKind::NoResponse
        );
    }
}
