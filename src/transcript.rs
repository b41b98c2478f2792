//! Append-only transcript of a call.
//!
//! The server streams transcription in fragments ("Hel", then "lo") and
//! marks turn boundaries separately. Fragments from the same speaker merge
//! into the trailing partial turn; a turn-complete marker freezes it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who said it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Model,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => f.write_str("You"),
            Speaker::Model => f.write_str("Tutor"),
        }
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    /// False while fragments may still be appended.
    pub finalized: bool,
}

/// What changed after feeding a fragment or marker, for incremental rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptUpdate {
    /// The trailing partial turn changed (extended or newly started).
    Partial(Turn),
    /// The trailing turn was finalized.
    Finalized(Turn),
    /// Nothing changed (e.g. turn-complete with no open turn).
    None,
}

/// Append-only turn aggregator. Turns are never reordered, merged across
/// speakers, or removed.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a transcription fragment.
    ///
    /// Extends the trailing turn when it has the same speaker and is still
    /// open; otherwise starts a new open turn.
    pub fn push_fragment(&mut self, speaker: Speaker, text: &str) -> TranscriptUpdate {
        if text.is_empty() {
            return TranscriptUpdate::None;
        }

        match self.turns.last_mut() {
            Some(last) if last.speaker == speaker && !last.finalized => {
                last.text.push_str(text);
                TranscriptUpdate::Partial(last.clone())
            }
            _ => {
                let turn = Turn {
                    speaker,
                    text: text.to_string(),
                    finalized: false,
                };
                self.turns.push(turn.clone());
                TranscriptUpdate::Partial(turn)
            }
        }
    }

    /// Mark the trailing open turn finalized. Earlier turns are untouched.
    pub fn finalize_turn(&mut self) -> TranscriptUpdate {
        match self.turns.last_mut() {
            Some(last) if !last.finalized => {
                last.finalized = true;
                TranscriptUpdate::Finalized(last.clone())
            }
            _ => TranscriptUpdate::None,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_from_same_speaker_merge_into_one_partial() {
        let mut transcript = Transcript::new();

        transcript.push_fragment(Speaker::User, "Hel");
        let update = transcript.push_fragment(Speaker::User, "lo");

        assert_eq!(transcript.len(), 1);
        let turn = &transcript.turns()[0];
        assert_eq!(turn.text, "Hello");
        assert!(!turn.finalized);
        match update {
            TranscriptUpdate::Partial(t) => assert_eq!(t.text, "Hello"),
            other => panic!("expected Partial, got {:?}", other),
        }
    }

    #[test]
    fn test_turn_complete_between_speakers_yields_two_turns() {
        let mut transcript = Transcript::new();

        transcript.push_fragment(Speaker::User, "How do I say this?");
        transcript.finalize_turn();
        transcript.push_fragment(Speaker::Model, "You could say...");

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0].speaker, Speaker::User);
        assert!(transcript.turns()[0].finalized);
        assert_eq!(transcript.turns()[1].speaker, Speaker::Model);
        assert!(!transcript.turns()[1].finalized);
    }

    #[test]
    fn test_speaker_change_starts_new_turn_without_marker() {
        let mut transcript = Transcript::new();

        transcript.push_fragment(Speaker::User, "Hi");
        transcript.push_fragment(Speaker::Model, "Hello!");

        assert_eq!(transcript.len(), 2);
        // The user turn stays open; it was simply not extended
        assert!(!transcript.turns()[0].finalized);
    }

    #[test]
    fn test_fragment_after_finalize_starts_new_turn_same_speaker() {
        let mut transcript = Transcript::new();

        transcript.push_fragment(Speaker::Model, "First answer.");
        transcript.finalize_turn();
        transcript.push_fragment(Speaker::Model, "Second answer.");

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0].text, "First answer.");
        assert_eq!(transcript.turns()[1].text, "Second answer.");
    }

    #[test]
    fn test_finalize_only_touches_trailing_turn() {
        let mut transcript = Transcript::new();

        transcript.push_fragment(Speaker::User, "Hi");
        transcript.push_fragment(Speaker::Model, "Hello!");
        transcript.finalize_turn();

        assert!(!transcript.turns()[0].finalized);
        assert!(transcript.turns()[1].finalized);
    }

    #[test]
    fn test_finalize_with_no_open_turn_is_noop() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.finalize_turn(), TranscriptUpdate::None);

        transcript.push_fragment(Speaker::User, "Hi");
        transcript.finalize_turn();
        // Second marker has nothing left to finalize
        assert_eq!(transcript.finalize_turn(), TranscriptUpdate::None);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_empty_fragment_is_ignored() {
        let mut transcript = Transcript::new();
        assert_eq!(
            transcript.push_fragment(Speaker::User, ""),
            TranscriptUpdate::None
        );
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_turns_are_append_only() {
        let mut transcript = Transcript::new();

        transcript.push_fragment(Speaker::User, "one");
        transcript.finalize_turn();
        transcript.push_fragment(Speaker::Model, "two");
        transcript.finalize_turn();
        transcript.push_fragment(Speaker::User, "three");

        let texts: Vec<&str> = transcript.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_speaker_display_names() {
        assert_eq!(Speaker::User.to_string(), "You");
        assert_eq!(Speaker::Model.to_string(), "Tutor");
    }
}
