// src/game.rs
// This module provides the GameSession struct that owns the board, the call history,
// the counters and the configuration of one bingo game. All mutation goes through its
// entry points; timers and front-ends never reach into the fields directly.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::announce::{opening_cue, Cue};
use crate::board::{Ball, Board};
use crate::config::GameConfig;
use crate::defs::{Letter, Number};
use crate::error::GameError;
use crate::extraction::{call_bingo_number, start_wild_bingo, DrawOutcome, WildOutcome};
use crate::manual::{toggle_ball, ToggleOutcome};
use crate::pattern::Pattern;
use crate::pouch::{OsEntropy, RandomSource};

pub const CHIMES: [&str; 10] = [
    "Chime 1", "Chime 2", "Chime 3", "Chime 4", "Chime 5",
    "Chime 6", "Chime 7", "Chime 8", "Chime 9", "Chime 10",
];

pub(crate) fn new_game_id() -> String {
    let mut rng = rand::rng();
    format!("game_{:08x}", rng.random::<u32>())
}

pub struct GameSession {
    pub(crate) id: String,
    pub(crate) created_at: SystemTime,
    pub(crate) board: Board,
    pub(crate) history: Vec<Number>,
    pub(crate) total_balls_called: u8,
    // Back-references into the board, by ball number
    pub(crate) current_ball: Option<Number>,
    pub(crate) previous_ball: Option<Number>,
    pub(crate) wild_ball: Option<Number>,
    pub(crate) running: bool,
    pub(crate) config: GameConfig,
    pub(crate) pattern: Pattern,
    pub(crate) selected_chime: String,
    pub(crate) selected_caller: Option<String>,
    pub(crate) show_reset_modal: bool,
    pub(crate) revision: u64,
    pub(crate) source: Box<dyn RandomSource>,
}

impl GameSession {
    /// Create a fresh game with the given rules and entropy source
    pub fn new(config: GameConfig, source: Box<dyn RandomSource>) -> Self {
        Self {
            id: new_game_id(),
            created_at: SystemTime::now(),
            board: Board::new(),
            history: Vec::new(),
            total_balls_called: 0,
            current_ball: None,
            previous_ball: None,
            wild_ball: None,
            running: false,
            config,
            pattern: Pattern::placeholder(),
            selected_chime: CHIMES[0].to_string(),
            selected_caller: None,
            show_reset_modal: false,
            revision: 0,
            source,
        }
    }

    pub fn with_os_entropy(config: GameConfig) -> Self {
        Self::new(config, Box::new(OsEntropy))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Get a human-readable creation time string
    pub fn created_at_string(&self) -> String {
        match self.created_at.duration_since(std::time::UNIX_EPOCH) {
            Ok(duration) => {
                let datetime: DateTime<Utc> = DateTime::from_timestamp(duration.as_secs() as i64, 0)
                    .unwrap_or_else(Utc::now);
                datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
            }
            Err(_) => "Unknown time".to_string(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Called balls in call order.
    pub fn history(&self) -> Vec<&Ball> {
        self.history.iter().filter_map(|&n| self.board.get(n)).collect()
    }

    pub fn history_numbers(&self) -> &[Number] {
        &self.history
    }

    /// The last `n` calls, most recent first.
    pub fn last_calls(&self, n: usize) -> Vec<&Ball> {
        self.history.iter().rev().take(n).filter_map(|&num| self.board.get(num)).collect()
    }

    pub fn total_balls_called(&self) -> u8 {
        self.total_balls_called
    }

    pub fn current_ball(&self) -> Option<&Ball> {
        self.current_ball.and_then(|n| self.board.get(n))
    }

    pub fn previous_ball(&self) -> Option<&Ball> {
        self.previous_ball.and_then(|n| self.board.get(n))
    }

    pub fn wild_ball(&self) -> Option<&Ball> {
        self.wild_ball.and_then(|n| self.board.get(n))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_game_started(&self) -> bool {
        self.total_balls_called > 0
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn selected_chime(&self) -> &str {
        &self.selected_chime
    }

    pub fn selected_caller(&self) -> Option<&str> {
        self.selected_caller.as_deref()
    }

    pub fn show_reset_modal(&self) -> bool {
        self.show_reset_modal
    }

    /// Bumped on every change, so front-ends know when to redraw and persist.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        if self.running != running {
            self.running = running;
            self.touch();
        }
    }

    /// Change configuration between draws.
    pub fn update_config<F: FnOnce(&mut GameConfig)>(&mut self, change: F) {
        change(&mut self.config);
        self.touch();
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
        self.touch();
    }

    pub fn toggle_pattern_slot(&mut self, letter: Letter, index: usize) {
        self.pattern.toggle_slot(letter, index);
        self.touch();
    }

    /// Select one of the known chimes; unknown ids are ignored.
    pub fn select_chime(&mut self, chime: &str) -> bool {
        if !CHIMES.contains(&chime) {
            return false;
        }
        self.selected_chime = chime.to_string();
        self.touch();
        true
    }

    pub fn select_caller(&mut self, voice: Option<String>) {
        self.selected_caller = voice;
        self.touch();
    }

    pub fn toggle_reset_modal(&mut self) {
        self.show_reset_modal = !self.show_reset_modal;
        self.touch();
    }

    /// Standard draw: call the next ball, applying skip-unused policy.
    pub fn call_next(&mut self) -> Result<DrawOutcome, GameError> {
        call_bingo_number(self)
    }

    /// Wild bingo opening draw.
    pub fn start_wild_bingo(&mut self) -> Result<WildOutcome, GameError> {
        start_wild_bingo(self)
    }

    /// Manual calling mode: mark or unmark one ball.
    pub fn toggle_ball(&mut self, number: Number) -> Result<ToggleOutcome, GameError> {
        toggle_ball(self, number)
    }

    /// Phrase to speak before the first draw of a game, if any.
    pub fn opening_cue(&self) -> Option<Cue> {
        opening_cue(&self.config)
    }

    /// Start over with a new board. Configuration, pattern and selections are kept.
    pub fn reset(&mut self) -> Vec<String> {
        let mut reset_components = Vec::new();

        self.id = new_game_id();
        self.created_at = SystemTime::now();
        reset_components.push(format!("New game ID generated: {}", self.id));

        self.board = Board::new();
        reset_components.push("Board regenerated with balls 1-75".to_string());

        self.history.clear();
        reset_components.push("Call history cleared".to_string());

        self.total_balls_called = 0;
        self.current_ball = None;
        self.previous_ball = None;
        self.wild_ball = None;
        reset_components.push("Counters cleared".to_string());

        self.running = false;
        self.show_reset_modal = false;
        self.touch();

        reset_components
    }

    /// Get game information as a formatted string for debugging/logging
    pub fn game_info(&self) -> String {
        format!(
            "Game[id={}, created={}, called={}, current={}, previous={}, running={}]",
            self.id,
            self.created_at_string(),
            self.total_balls_called,
            self.current_ball().map(Ball::label).unwrap_or_else(|| "-".to_string()),
            self.previous_ball().map(Ball::label).unwrap_or_else(|| "-".to_string()),
            self.running,
        )
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.game_info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pouch::ScriptedSource;

    fn scripted(bytes: &[u8]) -> GameSession {
        let config = GameConfig { skip_unused: false, ..GameConfig::default() };
        GameSession::new(config, Box::new(ScriptedSource::new(bytes.to_vec())))
    }

    #[test]
    fn test_session_creation() {
        let session = GameSession::with_os_entropy(GameConfig::default());

        assert_eq!(session.total_balls_called(), 0);
        assert!(session.history().is_empty());
        assert!(session.current_ball().is_none());
        assert!(session.previous_ball().is_none());
        assert!(!session.is_running());
        assert!(!session.has_game_started());
        assert!(session.pattern().is_placeholder());
        assert_eq!(session.selected_chime(), "Chime 1");

        assert!(session.id().starts_with("game_"));
        assert_eq!(session.id().len(), 13); // "game_" + 8 hex chars
        assert!(session.created_at_string().contains("UTC"));
    }

    #[test]
    fn test_reset_keeps_configuration() {
        let mut session = scripted(&[10, 20]);
        session.update_config(|c| c.double_call = true);
        session.toggle_pattern_slot(Letter::N, 2);
        session.call_next().unwrap();
        session.call_next().unwrap();
        let original_id = session.id().to_string();

        let components = session.reset();
        assert!(components.contains(&"Board regenerated with balls 1-75".to_string()));
        assert!(components.iter().any(|s| s.starts_with("New game ID generated:")));
        assert_ne!(session.id(), original_id);

        assert_eq!(session.total_balls_called(), 0);
        assert!(session.history().is_empty());
        assert!(session.current_ball().is_none());
        assert!(session.previous_ball().is_none());
        assert_eq!(session.board().called_count(), 0);
        assert!(session.config().double_call);
        assert_eq!(session.pattern().name, "Custom");
    }

    #[test]
    fn test_revision_tracks_changes() {
        let mut session = scripted(&[3]);
        let start = session.revision();
        session.call_next().unwrap();
        assert!(session.revision() > start);
        let after_call = session.revision();
        assert!(!session.select_chime("Chime 42"));
        assert_eq!(session.revision(), after_call);
        assert!(session.select_chime("Chime 7"));
        assert!(session.revision() > after_call);
    }

    #[test]
    fn test_last_calls_most_recent_first() {
        let mut session = scripted(&[10, 20, 30]);
        for _ in 0..3 {
            session.call_next().unwrap();
        }
        let last: Vec<Number> = session.last_calls(2).iter().map(|b| b.number).collect();
        assert_eq!(last, vec![30, 20]);
    }

    #[test]
    fn test_game_info() {
        let mut session = scripted(&[61]);
        session.call_next().unwrap();
        let info = session.game_info();
        assert!(info.contains(session.id()));
        assert!(info.contains("called=1"));
        assert!(info.contains("current=O 61"));
        assert!(info.contains("previous=-"));
        assert!(info.contains("running=false"));
    }
}
