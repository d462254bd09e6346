// lib.rs
// Library modules for the bingo caller

pub mod defs;
pub mod logging;
pub mod error;
pub mod pouch;
pub mod board;
pub mod pattern;
pub mod config;
pub mod announce;
pub mod extraction;
pub mod manual;
pub mod game;
pub mod snapshot;
pub mod autoplay;
pub mod terminal;
