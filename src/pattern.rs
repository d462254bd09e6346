// src/pattern.rs
// Winning pattern grid. Only the derived set of unused letters matters to the draw engine.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::defs::{Letter, PATTERN_SLOTS};

pub const PATTERN_PLACEHOLDER: &str = "Choose a pattern";
pub const CUSTOM_PATTERN: &str = "Custom";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub slots: BTreeMap<Letter, [bool; PATTERN_SLOTS]>,
}

impl Pattern {
    /// The "nothing selected yet" pattern. Never triggers skip-unused.
    pub fn placeholder() -> Self {
        Self::named(PATTERN_PLACEHOLDER, Letter::ALL.iter().map(|&l| (l, [false; PATTERN_SLOTS])))
    }

    pub fn named<I>(name: &str, slots: I) -> Self
    where
        I: IntoIterator<Item = (Letter, [bool; PATTERN_SLOTS])>,
    {
        let mut all: BTreeMap<Letter, [bool; PATTERN_SLOTS]> =
            Letter::ALL.iter().map(|&l| (l, [false; PATTERN_SLOTS])).collect();
        all.extend(slots);
        Pattern { name: name.to_string(), slots: all }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == PATTERN_PLACEHOLDER
    }

    /// Letters without any required slot.
    pub fn unused_letters(&self) -> BTreeSet<Letter> {
        self.slots
            .iter()
            .filter(|(_, slots)| !slots.contains(&true))
            .map(|(&letter, _)| letter)
            .collect()
    }

    /// Flip one slot; the result is always a custom pattern.
    pub fn toggle_slot(&mut self, letter: Letter, index: usize) {
        if index >= PATTERN_SLOTS {
            return;
        }
        let column = self.slots.entry(letter).or_insert([false; PATTERN_SLOTS]);
        column[index] = !column[index];
        self.name = CUSTOM_PATTERN.to_string();
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::placeholder()
    }
}
