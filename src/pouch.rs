// src/pouch.rs
// Random draw source: rejection sampling of ball numbers over a byte-level entropy source.

use std::collections::{HashSet, VecDeque};

use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::defs::{Number, FIRSTNUMBER, LASTNUMBER};
use crate::error::GameError;

/// Byte-level entropy used for every draw.
pub trait RandomSource: Send {
    fn next_byte(&mut self) -> Result<u8, GameError>;
}

/// Operating system CSPRNG. Failures surface as errors, never as a weaker generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl RandomSource for OsEntropy {
    fn next_byte(&mut self) -> Result<u8, GameError> {
        let mut buf = [0u8; 1];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| GameError::EntropyUnavailable(e.to_string()))?;
        Ok(buf[0])
    }
}

/// Replays a fixed byte sequence, e.g. to reproduce a recorded game.
/// Running out of bytes is reported like an unavailable entropy source.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    bytes: VecDeque<u8>,
}

impl ScriptedSource {
    pub fn new<I: IntoIterator<Item = u8>>(bytes: I) -> Self {
        Self { bytes: bytes.into_iter().collect() }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }
}

impl RandomSource for ScriptedSource {
    fn next_byte(&mut self) -> Result<u8, GameError> {
        self.bytes
            .pop_front()
            .ok_or_else(|| GameError::EntropyUnavailable("scripted source exhausted".to_string()))
    }
}

fn in_range(byte: u8) -> bool {
    (FIRSTNUMBER..=LASTNUMBER).contains(&byte)
}

/// Draw a number in 1..=75 that is not in `excluded`.
pub fn draw_unused(source: &mut dyn RandomSource, excluded: &HashSet<Number>) -> Result<Number, GameError> {
    let remaining = (FIRSTNUMBER..=LASTNUMBER).filter(|n| !excluded.contains(n)).count();
    if remaining == 0 {
        return Err(GameError::NoBallsLeft);
    }
    loop {
        let byte = source.next_byte()?;
        if in_range(byte) && !excluded.contains(&byte) {
            return Ok(byte);
        }
    }
}

/// Draw any number in 1..=75, ignoring what was already called.
pub fn draw_any(source: &mut dyn RandomSource) -> Result<Number, GameError> {
    loop {
        let byte = source.next_byte()?;
        if in_range(byte) {
            return Ok(byte);
        }
    }
}
