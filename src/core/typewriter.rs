//! Time-paced reveal of a finalized assistant reply.
//!
//! The reply text is complete before the reveal begins; this state machine
//! only controls how much of it is visible. It is deliberately independent
//! of the UI: the chat loop drives [`Typewriter::tick`] on a fixed cadence
//! and renders [`Typewriter::visible`] snapshots. Cancellation snaps to the
//! full text, never truncates.

use unicode_segmentation::UnicodeSegmentation;

use crate::core::constants::{REVEAL_DIVISOR, REVEAL_MAX_STEP, REVEAL_MIN_STEP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    /// Created but not yet started; nothing visible.
    Pending,
    /// Partially visible, advancing on each tick.
    Revealing,
    /// Fully visible. Terminal.
    Complete,
}

#[derive(Debug, Clone)]
pub struct Typewriter {
    text: String,
    /// Byte offset where each grapheme cluster starts, plus `text.len()` as
    /// the final entry. A visible prefix always ends on one of these, so a
    /// reveal boundary can never split a multi-byte character.
    boundaries: Vec<usize>,
    revealed: usize,
    phase: RevealPhase,
}

impl Typewriter {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut boundaries: Vec<usize> =
            text.grapheme_indices(true).map(|(offset, _)| offset).collect();
        boundaries.push(text.len());
        Self {
            text,
            boundaries,
            revealed: 0,
            phase: RevealPhase::Pending,
        }
    }

    /// Begin revealing. An empty reply has nothing to animate and completes
    /// immediately.
    pub fn start(&mut self) {
        if self.phase != RevealPhase::Pending {
            return;
        }
        self.phase = if self.total() == 0 {
            RevealPhase::Complete
        } else {
            RevealPhase::Revealing
        };
    }

    /// Advance one tick. Reveals `remaining / REVEAL_DIVISOR` graphemes,
    /// clamped between [`REVEAL_MIN_STEP`] and [`REVEAL_MAX_STEP`], so long
    /// replies move briskly and the tail eases out. Returns true when the
    /// visible prefix changed.
    pub fn tick(&mut self) -> bool {
        if self.phase != RevealPhase::Revealing {
            return false;
        }
        let remaining = self.total() - self.revealed;
        let step = (remaining / REVEAL_DIVISOR).clamp(REVEAL_MIN_STEP, REVEAL_MAX_STEP);
        self.revealed = (self.revealed + step).min(self.total());
        if self.revealed == self.total() {
            self.phase = RevealPhase::Complete;
        }
        true
    }

    /// Jump to the terminal state with the full text visible. Valid from
    /// any phase; used for cancellation and for superseded reveals.
    pub fn snap_to_end(&mut self) {
        self.revealed = self.total();
        self.phase = RevealPhase::Complete;
    }

    pub fn visible(&self) -> &str {
        &self.text[..self.boundaries[self.revealed]]
    }

    pub fn full_text(&self) -> &str {
        &self.text
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == RevealPhase::Complete
    }

    /// Number of grapheme clusters currently visible.
    pub fn revealed_len(&self) -> usize {
        self.revealed
    }

    /// Total number of grapheme clusters in the reply.
    pub fn total(&self) -> usize {
        self.boundaries.len() - 1
    }
}
