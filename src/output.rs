//! Terminal rendering for the live transcript and call status lines.
//!
//! Partial turns overwrite one line in place; finalized turns are printed
//! permanently, standing in for the original chat view.

use crate::transcript::{Speaker, Turn, TranscriptUpdate};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Clear the current terminal line (replaces an in-progress partial turn).
pub fn clear_line() {
    print!("\r\x1b[2K");
}

/// Plain-text form of a turn, used for both rendering and tests.
fn format_turn(turn: &Turn) -> String {
    format!("{}: {}", turn.speaker, turn.text)
}

/// Renders transcript updates incrementally to stdout.
pub struct TranscriptRenderer {
    quiet: bool,
    partial_open: bool,
}

impl TranscriptRenderer {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            partial_open: false,
        }
    }

    pub fn render(&mut self, update: &TranscriptUpdate) {
        if self.quiet {
            return;
        }

        match update {
            TranscriptUpdate::Partial(turn) => {
                if self.partial_open {
                    clear_line();
                }
                print!("{}", self.colorize(turn, true));
                let _ = io::stdout().flush();
                self.partial_open = true;
            }
            TranscriptUpdate::Finalized(turn) => {
                if self.partial_open {
                    clear_line();
                }
                println!("{}", self.colorize(turn, false));
                self.partial_open = false;
            }
            TranscriptUpdate::None => {}
        }
    }

    /// Finish any open partial line (e.g. before a status message).
    pub fn finish(&mut self) {
        if self.partial_open && !self.quiet {
            println!();
            self.partial_open = false;
        }
    }

    fn colorize(&self, turn: &Turn, partial: bool) -> String {
        let line = format_turn(turn);
        if partial {
            return line.dimmed().to_string();
        }
        match turn.speaker {
            Speaker::User => line.green().to_string(),
            Speaker::Model => line.cyan().to_string(),
        }
    }
}

/// Status line on stderr, suppressed in quiet mode.
pub fn status(quiet: bool, message: &str) {
    if !quiet {
        eprintln!("{}", message.dimmed());
    }
}

/// Error line on stderr, never suppressed.
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(speaker: Speaker, text: &str, finalized: bool) -> Turn {
        Turn {
            speaker,
            text: text.to_string(),
            finalized,
        }
    }

    #[test]
    fn test_format_turn_user() {
        let t = turn(Speaker::User, "Hello there", false);
        assert_eq!(format_turn(&t), "You: Hello there");
    }

    #[test]
    fn test_format_turn_model() {
        let t = turn(Speaker::Model, "Hi! How are you?", true);
        assert_eq!(format_turn(&t), "Tutor: Hi! How are you?");
    }

    #[test]
    fn test_quiet_renderer_stays_silent() {
        // Smoke test: no panic, no state change
        let mut renderer = TranscriptRenderer::new(true);
        renderer.render(&TranscriptUpdate::Partial(turn(Speaker::User, "Hel", false)));
        renderer.render(&TranscriptUpdate::Finalized(turn(
            Speaker::User,
            "Hello",
            true,
        )));
        renderer.finish();
        assert!(!renderer.partial_open);
    }

    #[test]
    fn test_finalize_closes_partial_line() {
        let mut renderer = TranscriptRenderer::new(false);
        renderer.render(&TranscriptUpdate::Partial(turn(Speaker::User, "Hel", false)));
        assert!(renderer.partial_open);

        renderer.render(&TranscriptUpdate::Finalized(turn(
            Speaker::User,
            "Hello",
            true,
        )));
        assert!(!renderer.partial_open);
    }

    #[test]
    fn test_none_update_is_ignored() {
        let mut renderer = TranscriptRenderer::new(false);
        renderer.render(&TranscriptUpdate::None);
        assert!(!renderer.partial_open);
    }
}
