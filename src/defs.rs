// src/defs.rs
// Board geometry, ball ranges and the pacing constants shared by the caller.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub type Number = u8;

pub const FIRSTNUMBER: Number = 1;
pub const LASTNUMBER: Number = 75;
pub const BALLS_PER_LETTER: Number = 15;
pub const TOTAL_BALLS: u8 = LASTNUMBER - FIRSTNUMBER + 1;

// Slots per letter in a winning pattern (the 5x5 card column)
pub const PATTERN_SLOTS: usize = 5;

// Autoplay interval used when nothing else is configured
pub const DEFAULT_DELAY_MS: u64 = 6000;
// Pause after the opening phrase before the first ball is called
pub const START_CALL_DELAY: Duration = Duration::from_millis(2000);
// Pause before the chatty wild-number announcement
pub const WILD_TALK_DELAY: Duration = Duration::from_millis(2000);
// Lead time between the chime and the voice for the same ball
pub const CHIME_LEAD: Duration = Duration::from_millis(1000);

/// Column letter of the bingo board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Letter {
    B,
    I,
    N,
    G,
    O,
}

impl Letter {
    pub const ALL: [Letter; 5] = [Letter::B, Letter::I, Letter::N, Letter::G, Letter::O];

    /// Letter owning the given ball number, or None when out of range.
    pub fn for_number(number: Number) -> Option<Letter> {
        if !(FIRSTNUMBER..=LASTNUMBER).contains(&number) {
            return None;
        }
        let index = ((number - FIRSTNUMBER) / BALLS_PER_LETTER) as usize;
        Some(Self::ALL[index])
    }

    fn index(&self) -> Number {
        match self {
            Letter::B => 0,
            Letter::I => 1,
            Letter::N => 2,
            Letter::G => 3,
            Letter::O => 4,
        }
    }

    /// Inclusive number range covered by this letter.
    pub fn range(&self) -> std::ops::RangeInclusive<Number> {
        let first = FIRSTNUMBER + self.index() * BALLS_PER_LETTER;
        first..=first + BALLS_PER_LETTER - 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Letter::B => "B",
            Letter::I => "I",
            Letter::N => "N",
            Letter::G => "G",
            Letter::O => "O",
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
