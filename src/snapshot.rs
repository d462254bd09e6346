// src/snapshot.rs
// Persisting an in-progress game as two JSON records and bringing it back after a restart.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::board::{Ball, Board};
use crate::config::GameConfig;
use crate::defs::Number;
use crate::error::SnapshotError;
use crate::game::GameSession;
use crate::logging::{log_info, log_warning};
use crate::pattern::Pattern;
use crate::pouch::RandomSource;

pub const GAME_DATA_KEY: &str = "game-data";
pub const GAME_STATE_KEY: &str = "game-state";

/// Transient counters of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    pub total_balls_called: u8,
    pub previous_ball: Option<Ball>,
    pub current_ball: Option<Ball>,
    // A timer cannot outlive the process; always written as null and ignored on load
    pub interval: Option<u64>,
}

/// Board, history and every setting of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub id: String,
    pub created_at: SystemTime,
    pub board: Board,
    pub history: Vec<Number>,
    pub wild_ball: Option<Number>,
    pub config: GameConfig,
    pub running: bool,
    pub pattern: Pattern,
    pub selected_chime: String,
    pub selected_caller: Option<String>,
    pub show_reset_modal: bool,
}

/// Key/value storage for snapshot records.
pub trait SnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), SnapshotError>;
}

/// One `<key>.json` file per record inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.records.remove(key)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        Ok(self.records.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), SnapshotError> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn pointer(board: &Board, ball: &Option<Ball>, name: &str) -> Result<Option<Number>, SnapshotError> {
    let Some(ball) = ball else {
        return Ok(None);
    };
    match board.get(ball.number) {
        Some(on_board) if on_board.letter == ball.letter && on_board.called => Ok(Some(ball.number)),
        Some(on_board) if on_board.letter == ball.letter => {
            Err(SnapshotError::Malformed(format!("{name} {} is not a called ball", ball.number)))
        }
        _ => Err(SnapshotError::Malformed(format!("{name} {} is not on the board", ball.number))),
    }
}

fn validate_history(board: &Board, history: &[Number]) -> Result<(), SnapshotError> {
    let mut seen = HashSet::new();
    for &number in history {
        let called = board.get(number).map(|ball| ball.called).unwrap_or(false);
        if !called {
            return Err(SnapshotError::Malformed(format!("history entry {number} is not a called ball")));
        }
        if !seen.insert(number) {
            return Err(SnapshotError::Malformed(format!("history entry {number} appears twice")));
        }
    }
    if history.len() != board.called_count() {
        return Err(SnapshotError::Malformed(format!(
            "history has {} entries but {} balls are called",
            history.len(),
            board.called_count()
        )));
    }
    Ok(())
}

impl GameSession {
    pub fn snapshot(&self) -> (GameData, GameState) {
        let data = GameData {
            total_balls_called: self.total_balls_called,
            previous_ball: self.previous_ball().cloned(),
            current_ball: self.current_ball().cloned(),
            interval: None,
        };
        let state = GameState {
            id: self.id.clone(),
            created_at: self.created_at,
            board: self.board.clone(),
            history: self.history.clone(),
            wild_ball: self.wild_ball,
            config: self.config.clone(),
            running: self.running,
            pattern: self.pattern.clone(),
            selected_chime: self.selected_chime.clone(),
            selected_caller: self.selected_caller.clone(),
            show_reset_modal: self.show_reset_modal,
        };
        (data, state)
    }

    pub fn save_to(&self, store: &mut dyn SnapshotStore) -> Result<(), SnapshotError> {
        let (data, state) = self.snapshot();
        store.save(GAME_DATA_KEY, &serde_json::to_string(&data)?)?;
        store.save(GAME_STATE_KEY, &serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }

    /// Rebuild a session from its records. Autoplay always comes back stopped.
    pub fn from_snapshot(data: GameData, state: GameState, source: Box<dyn RandomSource>) -> Result<Self, SnapshotError> {
        let pointers = validate(&data, &state)?;
        Ok(assemble(data, state, pointers, source))
    }

    pub fn restore(store: &dyn SnapshotStore, source: Box<dyn RandomSource>) -> Result<Self, SnapshotError> {
        let (data, state) = load_records(store)?;
        Self::from_snapshot(data, state, source)
    }

    /// Resume the saved game, or start a fresh one with `config` if there is nothing usable.
    pub fn restore_or_new(store: &dyn SnapshotStore, config: GameConfig, source: Box<dyn RandomSource>) -> Self {
        let checked = load_records(store)
            .and_then(|(data, state)| validate(&data, &state).map(|pointers| (data, state, pointers)));

        match checked {
            Ok((data, state, pointers)) => {
                let session = assemble(data, state, pointers, source);
                log_info(&format!("Restored {}", session.game_info()));
                session
            }
            Err(SnapshotError::Missing(key)) => {
                log_info(&format!("No saved game ({key} missing), starting a new one"));
                GameSession::new(config, source)
            }
            Err(e) => {
                log_warning(&format!("Discarding saved game: {e}"));
                GameSession::new(config, source)
            }
        }
    }
}

struct Pointers {
    current: Option<Number>,
    previous: Option<Number>,
}

fn load_records(store: &dyn SnapshotStore) -> Result<(GameData, GameState), SnapshotError> {
    let data = store.load(GAME_DATA_KEY)?.ok_or(SnapshotError::Missing(GAME_DATA_KEY))?;
    let state = store.load(GAME_STATE_KEY)?.ok_or(SnapshotError::Missing(GAME_STATE_KEY))?;
    Ok((serde_json::from_str(&data)?, serde_json::from_str(&state)?))
}

fn validate(data: &GameData, state: &GameState) -> Result<Pointers, SnapshotError> {
    state.board.validate().map_err(SnapshotError::Malformed)?;
    validate_history(&state.board, &state.history)?;
    if data.total_balls_called as usize != state.history.len() {
        return Err(SnapshotError::Malformed(format!(
            "counter says {} balls called, history has {}",
            data.total_balls_called,
            state.history.len()
        )));
    }
    let current = pointer(&state.board, &data.current_ball, "current ball")?;
    let previous = pointer(&state.board, &data.previous_ball, "previous ball")?;
    if let Some(wild) = state.wild_ball {
        if !state.board.get(wild).is_some_and(|ball| ball.called) {
            return Err(SnapshotError::Malformed(format!("wild ball {wild} is not a called ball")));
        }
    }
    if state.config.delay == 0 {
        return Err(SnapshotError::Malformed("autoplay delay is zero".to_string()));
    }
    Ok(Pointers { current, previous })
}

fn assemble(data: GameData, state: GameState, pointers: Pointers, source: Box<dyn RandomSource>) -> GameSession {
    let mut session = GameSession::new(state.config, source);
    session.id = state.id;
    session.created_at = state.created_at;
    session.board = state.board;
    session.history = state.history;
    session.total_balls_called = data.total_balls_called;
    session.current_ball = pointers.current;
    session.previous_ball = pointers.previous;
    session.wild_ball = state.wild_ball;
    session.pattern = state.pattern;
    session.selected_chime = state.selected_chime;
    session.selected_caller = state.selected_caller;
    // Neither the timer nor the modal survive a restart
    session.running = false;
    session.show_reset_modal = false;
    if state.running {
        log_warning(&format!("Game {}: autoplay was running when saved, restored stopped", session.id));
    }
    session
}
