// src/board.rs
// This module handles the 5x15 bingo board and the called/active state of every ball.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::defs::{Letter, Number, BALLS_PER_LETTER, FIRSTNUMBER, LASTNUMBER, TOTAL_BALLS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ball {
    pub letter: Letter,
    pub number: Number,
    pub called: bool,
    // Display-only: set for the ball surfaced by the latest draw, recomputed every cycle
    pub active: bool,
}

impl Ball {
    fn new(letter: Letter, number: Number) -> Self {
        Ball { letter, number, called: false, active: false }
    }

    /// "B 7" style label used by the terminal and the logs.
    pub fn label(&self) -> String {
        format!("{} {}", self.letter, self.number)
    }
}

/// The bingo board: every letter maps to its 15 balls in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    columns: BTreeMap<Letter, Vec<Ball>>,
}

impl Board {
    pub fn new() -> Self {
        let columns = Letter::ALL
            .iter()
            .map(|&letter| (letter, letter.range().map(|n| Ball::new(letter, n)).collect()))
            .collect();
        Board { columns }
    }

    /// Balls in board order: letter by letter, ascending inside a letter.
    pub fn balls(&self) -> impl Iterator<Item = &Ball> {
        self.columns.values().flatten()
    }

    pub fn balls_mut(&mut self) -> impl Iterator<Item = &mut Ball> {
        self.columns.values_mut().flatten()
    }

    pub fn column(&self, letter: Letter) -> &[Ball] {
        self.columns.get(&letter).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, number: Number) -> Option<&Ball> {
        let letter = Letter::for_number(number)?;
        self.columns.get(&letter)?.iter().find(|ball| ball.number == number)
    }

    pub fn get_mut(&mut self, number: Number) -> Option<&mut Ball> {
        let letter = Letter::for_number(number)?;
        self.columns.get_mut(&letter)?.iter_mut().find(|ball| ball.number == number)
    }

    pub fn clear_active(&mut self) {
        for ball in self.balls_mut() {
            ball.active = false;
        }
    }

    pub fn called_numbers(&self) -> HashSet<Number> {
        self.balls().filter(|ball| ball.called).map(|ball| ball.number).collect()
    }

    pub fn called_count(&self) -> usize {
        self.balls().filter(|ball| ball.called).count()
    }

    pub fn active_numbers(&self) -> Vec<Number> {
        self.balls().filter(|ball| ball.active).map(|ball| ball.number).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    /// Structural check used on restore: 75 balls, each number once, under the right letter.
    pub fn validate(&self) -> Result<(), String> {
        if self.columns.len() != Letter::ALL.len() {
            return Err(format!("board has {} letters instead of 5", self.columns.len()));
        }
        let mut seen = HashSet::new();
        for (letter, balls) in &self.columns {
            if balls.len() != BALLS_PER_LETTER as usize {
                return Err(format!("letter {letter} has {} balls instead of {BALLS_PER_LETTER}", balls.len()));
            }
            for ball in balls {
                if ball.letter != *letter || Letter::for_number(ball.number) != Some(*letter) {
                    return Err(format!("ball {} is filed under letter {letter}", ball.number));
                }
                if !seen.insert(ball.number) {
                    return Err(format!("ball {} appears twice", ball.number));
                }
            }
        }
        if seen.len() != TOTAL_BALLS as usize || !(FIRSTNUMBER..=LASTNUMBER).all(|n| seen.contains(&n)) {
            return Err("board does not hold every ball exactly once".to_string());
        }
        Ok(())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
