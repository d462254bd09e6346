// src/bingo_caller.rs
// Interactive bingo caller for the terminal. Calls balls by hand or on a timer,
// announces them, and keeps the game saved so it survives a restart.
//
// Interactive Controls:
// - N / SPACE: call the next ball (the first press starts the game)
// - P: start or pause autoplay
// - R: reset the game, after confirmation
// - M: manual calling mode; type a ball number and ENTER to mark/unmark it
// - W, E, S, C, D, H: toggle wild bingo, evens/odds, skip unused, caller, double call, chime
// - + / -: shorten or lengthen the autoplay delay
// - ESC / Q: exit
//
// CLI Options:
// - --newgame: Discard the saved game and start a fresh one
//
// Log lines go to bingo-caller.log inside the state directory.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use bingo_caller::announce::Announcer;
use bingo_caller::autoplay::{shared, Autoplay};
use bingo_caller::config::{GameConfig, CONFIG_PATH};
use bingo_caller::defs::Number;
use bingo_caller::error::GameError;
use bingo_caller::extraction::DrawOutcome;
use bingo_caller::game::GameSession;
use bingo_caller::logging::{log_error, log_error_stderr, log_info, log_to_file};
use bingo_caller::pouch::OsEntropy;
use bingo_caller::snapshot::FileStore;
use bingo_caller::terminal::{self, KeyAction, TerminalCaller, TerminalChime};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const DELAY_STEP_MS: u64 = 1000;

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
#[command(about = "Bingo Caller - Call, announce and track a 75-ball bingo game")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Configuration file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Directory holding the saved game
    #[arg(long, default_value = "data/session")]
    state_dir: PathBuf,

    /// Discard the saved game and start a fresh one
    #[arg(long)]
    newgame: bool,

    /// Start in manual calling mode
    #[arg(long)]
    manual: bool,

    /// Play wild bingo
    #[arg(long)]
    wild: bool,

    /// Wild bingo marks all evens or all odds instead of a digit suffix
    #[arg(long)]
    evens_odds: bool,

    /// Announce calls
    #[arg(long)]
    caller: bool,

    /// Ring a chime before each call
    #[arg(long)]
    chime: bool,

    /// Repeat the number digit by digit
    #[arg(long)]
    double_call: bool,

    /// Call balls from letters the pattern does not use
    #[arg(long)]
    no_skip: bool,

    /// Autoplay delay in milliseconds
    #[arg(long)]
    delay: Option<u64>,
}

impl Args {
    // Flags only switch things on; the config file decides the rest.
    fn apply(&self, config: &mut GameConfig) {
        config.display_board_only |= self.manual;
        config.wild_bingo |= self.wild;
        config.evens_odds |= self.evens_odds;
        config.enable_caller |= self.caller;
        config.chime |= self.chime;
        config.double_call |= self.double_call;
        if self.no_skip {
            config.skip_unused = false;
        }
        if let Some(delay) = self.delay.filter(|&d| d > 0) {
            config.delay = delay;
        }
    }
}

fn describe(outcome: &DrawOutcome) -> String {
    match outcome {
        DrawOutcome::Called { skipped, .. } if !skipped.is_empty() => {
            format!("Skipped {} ball(s) outside the pattern", skipped.len())
        }
        DrawOutcome::Called { .. } => String::new(),
        DrawOutcome::Exhausted { skipped } => {
            format!("Only balls outside the pattern were left ({} skipped)", skipped.len())
        }
        DrawOutcome::OutOfBalls { .. } => "Game over: all balls have been called".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    // The board owns stdout from here on
    let log_path = args.state_dir.join("bingo-caller.log");
    if let Err(e) = log_to_file(&log_path) {
        log_error_stderr(&format!("Cannot log to {}: {e}", log_path.display()));
    }

    let mut config = GameConfig::load_from_or_default(&args.config);
    args.apply(&mut config);

    let mut store = FileStore::new(&args.state_dir);
    let session = if args.newgame {
        log_info("Starting a new game as requested");
        GameSession::new(config, Box::new(OsEntropy))
    } else {
        GameSession::restore_or_new(&store, config, Box::new(OsEntropy))
    };

    let caller = Arc::new(TerminalCaller::default());
    let announcer = Arc::new(Announcer::new(caller.clone(), Arc::new(TerminalChime)));
    let mut autoplay = Autoplay::new(shared(session), announcer.clone());

    let mut input = String::new();
    let mut status: Option<String> = None;
    let mut saved_revision = None;
    let mut dirty = true;
    let mut last_spoken = None;

    loop {
        let revision = autoplay.with_session(|session| session.revision());
        if saved_revision != Some(revision) {
            if let Err(e) = autoplay.with_session(|session| session.save_to(&mut store)) {
                log_error(&format!("Failed to save the game: {e}"));
            }
            saved_revision = Some(revision);
            dirty = true;
        }

        let spoken = caller.last();
        if spoken != last_spoken {
            last_spoken = spoken.clone();
            dirty = true;
        }

        if dirty {
            autoplay.with_session(|session| {
                terminal::show_on_terminal(session, spoken.as_deref(), &input, status.as_deref())
            });
            dirty = false;
        }

        let action = match tokio::task::spawn_blocking(|| terminal::poll_action(POLL_INTERVAL)).await? {
            Ok(Some(action)) => action,
            Ok(None) => continue,
            Err(e) => {
                log_error_stderr(&format!("Terminal error: {e}"));
                break;
            }
        };
        dirty = true;
        status = None;

        let result: Result<(), GameError> = match action {
            KeyAction::Exit => break,
            KeyAction::CallNext => {
                if autoplay.with_session(|session| session.has_game_started()) {
                    autoplay.call_next().map(|outcome| {
                        let note = describe(&outcome);
                        if !note.is_empty() {
                            status = Some(note);
                        }
                    })
                } else {
                    autoplay.begin(false).await.map(|_| ())
                }
            }
            KeyAction::PlayPause => autoplay.play_pause().await.map(|_| ()),
            KeyAction::Reset => {
                autoplay.with_session(|session| session.toggle_reset_modal());
                if terminal::confirm("Start a new game? All calls will be cleared.")? {
                    for component in autoplay.reset() {
                        log_info(&component);
                    }
                    input.clear();
                } else {
                    autoplay.with_session(|session| session.toggle_reset_modal());
                }
                Ok(())
            }
            KeyAction::ToggleManual => {
                let manual = autoplay.with_session(|session| session.config().display_board_only);
                autoplay.set_manual_mode(!manual);
                input.clear();
                Ok(())
            }
            KeyAction::ToggleWild => {
                autoplay.with_session(|session| session.update_config(|c| c.wild_bingo = !c.wild_bingo));
                Ok(())
            }
            KeyAction::ToggleEvensOdds => {
                autoplay.with_session(|session| session.update_config(|c| c.evens_odds = !c.evens_odds));
                Ok(())
            }
            KeyAction::ToggleSkip => {
                autoplay.with_session(|session| session.update_config(|c| c.skip_unused = !c.skip_unused));
                Ok(())
            }
            KeyAction::ToggleCaller => {
                autoplay.with_session(|session| session.update_config(|c| c.enable_caller = !c.enable_caller));
                Ok(())
            }
            KeyAction::ToggleDoubleCall => {
                autoplay.with_session(|session| session.update_config(|c| c.double_call = !c.double_call));
                Ok(())
            }
            KeyAction::ToggleChime => {
                autoplay.with_session(|session| session.update_config(|c| c.chime = !c.chime));
                Ok(())
            }
            KeyAction::Faster => {
                let delay = autoplay.with_session(|session| session.config().delay);
                autoplay.set_delay(delay.saturating_sub(DELAY_STEP_MS).max(DELAY_STEP_MS));
                Ok(())
            }
            KeyAction::Slower => {
                let delay = autoplay.with_session(|session| session.config().delay);
                autoplay.set_delay(delay + DELAY_STEP_MS);
                Ok(())
            }
            KeyAction::Digit(digit) => {
                if input.len() < 2 {
                    input.push(digit);
                }
                Ok(())
            }
            KeyAction::Backspace => {
                input.pop();
                Ok(())
            }
            KeyAction::Enter => {
                let typed = std::mem::take(&mut input);
                match typed.parse::<Number>() {
                    Ok(number) => autoplay.toggle_ball(number).map(|_| ()),
                    Err(_) => Ok(()),
                }
            }
        };

        if let Err(e) = result {
            log_error(&e.to_string());
            status = Some(e.to_string());
        }
    }

    autoplay.stop();
    announcer.cancel_all();
    autoplay.with_session(|session| session.save_to(&mut store))?;
    log_info("Bingo caller stopped, game saved");
    Ok(())
}
