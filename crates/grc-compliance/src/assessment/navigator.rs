//! Cursor over a framework's leaf sequence
//!
//! Positions are indices into the flattened leaf list. Past the last leaf
//! lies the review step.

use serde::{Deserialize, Serialize};

/// Where an assessor is within a framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Nothing selected yet
    #[default]
    NotStarted,
    /// Displaying the leaf at this index
    At(usize),
    /// Past the last leaf
    Review,
}

/// Navigation cursor over `len` leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    position: Position,
    len: usize,
}

impl Cursor {
    /// Cursor restored from a saved position; out-of-range indices land on review
    pub fn new(position: Position, len: usize) -> Self {
        let position = match position {
            Position::At(idx) if idx >= len => Position::Review,
            other => other,
        };
        Self { position, len }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Index of the displayed leaf
    pub fn current(&self) -> Option<usize> {
        match self.position {
            Position::At(idx) => Some(idx),
            _ => None,
        }
    }

    /// Advance; moving past the last leaf enters review and yields `None`
    pub fn next(&mut self) -> Option<usize> {
        self.position = match self.position {
            Position::NotStarted if self.len > 0 => Position::At(0),
            Position::At(idx) if idx + 1 < self.len => Position::At(idx + 1),
            _ => Position::Review,
        };
        self.current()
    }

    /// Step back; stays on the first leaf, review returns to the last leaf
    pub fn previous(&mut self) -> Option<usize> {
        self.position = match self.position {
            Position::At(idx) => Position::At(idx.saturating_sub(1)),
            Position::Review if self.len > 0 => Position::At(self.len - 1),
            Position::NotStarted if self.len > 0 => Position::At(0),
            other => other,
        };
        self.current()
    }

    /// Select a leaf by index
    pub fn jump(&mut self, idx: usize) -> Option<usize> {
        self.position = if idx < self.len {
            Position::At(idx)
        } else {
            Position::Review
        };
        self.current()
    }

    /// Enter the review step
    pub fn review(&mut self) {
        self.position = Position::Review;
    }
}
