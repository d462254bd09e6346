// src/terminal.rs
// This module handles terminal input/output for the bingo caller.

use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};

use crate::announce::{render, Caller, ChimePlayer, Token};
use crate::board::Ball;
use crate::defs::Letter;
use crate::game::GameSession;

pub enum KeyAction {
    CallNext,
    PlayPause,
    Reset,
    ToggleManual,
    ToggleWild,
    ToggleEvensOdds,
    ToggleSkip,
    ToggleCaller,
    ToggleDoubleCall,
    ToggleChime,
    Faster,
    Slower,
    Digit(char),
    Backspace,
    Enter,
    Exit,
}

/// Voice stand-in: remembers the last utterance so the screen can show it.
#[derive(Default)]
pub struct TerminalCaller {
    last: Mutex<Option<String>>,
}

impl TerminalCaller {
    pub fn last(&self) -> Option<String> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

impl Caller for TerminalCaller {
    fn speak(&self, parts: &[Token]) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(render(parts));
        }
    }

    fn cancel(&self) {
        if let Ok(mut last) = self.last.lock() {
            *last = None;
        }
    }
}

/// Rings the terminal bell.
pub struct TerminalChime;

impl ChimePlayer for TerminalChime {
    fn play(&self, _chime: &str) {
        print!("\x07");
        let _ = io::stdout().flush();
    }
}

fn ball_cell(ball: &Ball) -> String {
    if ball.active {
        format!("\x1b[1;32m{:2}\x1b[0m", ball.number) // Bold green for the ball just called
    } else if ball.called {
        format!("\x1b[1;33m{:2}\x1b[0m", ball.number) // Bold yellow for called balls
    } else {
        format!("\x1b[2m{:2}\x1b[0m", ball.number)
    }
}

pub fn print_board(session: &GameSession) {
    for letter in Letter::ALL {
        let cells: Vec<String> = session.board().column(letter).iter().map(ball_cell).collect();
        println!(" \x1b[1m{letter}\x1b[0m  {}", cells.join("  "));
    }
}

fn ball_or_dash(ball: Option<&Ball>) -> String {
    ball.map(Ball::label).unwrap_or_else(|| "-".to_string())
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

pub fn show_on_terminal(session: &GameSession, spoken: Option<&str>, input: &str, status: Option<&str>) {
    print!("\x1Bc"); // Clear the screen
    println!("Game {} - started {}", session.id(), session.created_at_string());
    println!();
    println!("Current ball: \x1b[1;32m{}\x1b[0m", ball_or_dash(session.current_ball()));
    println!("Previous ball: {}", ball_or_dash(session.previous_ball()));
    if let Some(wild) = session.wild_ball() {
        println!("Wild ball: {}", wild.label());
    }
    let last: Vec<String> = session.last_calls(5).into_iter().map(Ball::label).collect();
    println!("Last calls: {}", last.join(", "));
    println!("Balls called: {}/75", session.total_balls_called());
    println!();
    print_board(session);
    println!();

    let config = session.config();
    println!(
        "Autoplay: {} every {} ms | manual: {} | wild: {} | evens/odds: {} | skip unused: {}",
        if session.is_running() { "\x1b[1;32mrunning\x1b[0m" } else { "stopped" },
        config.delay,
        on_off(config.display_board_only),
        on_off(config.wild_bingo),
        on_off(config.evens_odds),
        on_off(config.skip_unused),
    );
    println!(
        "Caller: {} | double call: {} | chatty: {} | chime: {} ({})",
        on_off(config.enable_caller),
        on_off(config.double_call),
        on_off(config.extra_talk),
        on_off(config.chime),
        session.selected_chime(),
    );
    if let Some(spoken) = spoken {
        println!("\x1b[1;36m\u{1F50A} {spoken}\x1b[0m");
    }
    if let Some(status) = status {
        println!("\x1b[1;31m{status}\x1b[0m");
    }
    println!();
    if config.display_board_only {
        println!("Type a ball number and ENTER to mark/unmark it: {input}");
    }
    println!("[N]ext ball  [P]lay/pause  [R]eset  [M]anual  [W]ild  [E]vens/odds  [S]kip unused");
    println!("[C]aller  [D]ouble call  [H]chime  [+/-] delay  [ESC/Q] quit");
}

fn map_key(code: KeyCode) -> Option<KeyAction> {
    let action = match code {
        KeyCode::Esc => KeyAction::Exit,
        KeyCode::Enter => KeyAction::Enter,
        KeyCode::Backspace => KeyAction::Backspace,
        KeyCode::Char(c) if c.is_ascii_digit() => KeyAction::Digit(c),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'q' => KeyAction::Exit,
            'n' | ' ' => KeyAction::CallNext,
            'p' => KeyAction::PlayPause,
            'r' => KeyAction::Reset,
            'm' => KeyAction::ToggleManual,
            'w' => KeyAction::ToggleWild,
            'e' => KeyAction::ToggleEvensOdds,
            's' => KeyAction::ToggleSkip,
            'c' => KeyAction::ToggleCaller,
            'd' => KeyAction::ToggleDoubleCall,
            'h' => KeyAction::ToggleChime,
            '+' => KeyAction::Faster,
            '-' => KeyAction::Slower,
            _ => return None,
        },
        _ => return None,
    };
    Some(action)
}

/// Wait up to `timeout` for a key press.
pub fn poll_action(timeout: Duration) -> io::Result<Option<KeyAction>> {
    enable_raw_mode()?;
    let result = (|| {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            // Only process key press events, not key release events
            Event::Key(key_event) if key_event.kind == KeyEventKind::Press => Ok(map_key(key_event.code)),
            _ => Ok(None),
        }
    })();
    disable_raw_mode()?;
    result
}

/// Ask a yes/no question; anything but 'y' means no.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    println!("\n{prompt} [y/N]");
    enable_raw_mode()?;

    // Clear any pending events in the buffer
    while event::poll(Duration::from_millis(0))? {
        event::read()?;
    }

    let answer = loop {
        if let Event::Key(key_event) = event::read()? {
            if key_event.kind == KeyEventKind::Press {
                break matches!(key_event.code, KeyCode::Char('y') | KeyCode::Char('Y'));
            }
        }
    };

    disable_raw_mode()?;
    Ok(answer)
}
