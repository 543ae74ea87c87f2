//! # Candidates — Wheel-10 Candidate Generator
//!
//! Produces the ordered stream of integers above 10 that end in 1, 3, 7 or 9.
//! Multiples of 2 and 5 never appear; every other composite (21, 27, 33, 49,
//! ...) still does, and is left for the shards to reject.
//!
//! ## Step Rule
//!
//! The cursor starts at 9, which is never emitted. Each step advances the
//! cursor by 4 when it currently ends in 3 (skipping the 5) and by 2
//! otherwise, then yields the new value:
//!
//! ```text
//! 9 → 11 → 13 → 17 → 19 → 21 → 23 → 27 → 29 → 31 → 33 → 37 → ...
//! ```
//!
//! The generator is not restartable. A fresh instance starts over at 11.
//! It ends only if the cursor would overflow `u64`.

/// Initial cursor value. Never yielded itself.
pub const INITIAL_CURSOR: u64 = 9;

#[derive(Debug, Clone)]
pub struct Candidates {
    cursor: u64,
}

impl Candidates {
    pub fn new() -> Self {
        Candidates {
            cursor: INITIAL_CURSOR,
        }
    }

    /// The last value yielded (or the initial cursor if nothing was yielded yet).
    #[cfg(test)]
    pub(crate) fn cursor(&self) -> u64 {
        self.cursor
    }
}

impl Default for Candidates {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Candidates {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let step = if self.cursor % 10 == 3 { 4 } else { 2 };
        self.cursor = self.cursor.checked_add(step)?;
        Some(self.cursor)
    }
}
