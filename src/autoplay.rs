// src/autoplay.rs
// Timer-driven calling. A single tokio task draws a ball every `delay` milliseconds;
// stopping, resetting or rescheduling bumps an epoch so a tick that already woke up can
// never touch the session afterwards.
//
// Methods that schedule work must run inside a tokio runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::announce::Announcer;
use crate::defs::{Number, START_CALL_DELAY};
use crate::error::GameError;
use crate::extraction::DrawOutcome;
use crate::game::GameSession;
use crate::logging::{log_error, log_info};
use crate::manual::ToggleOutcome;

pub type SharedSession = Arc<Mutex<GameSession>>;

pub fn shared(session: GameSession) -> SharedSession {
    Arc::new(Mutex::new(session))
}

fn lock(session: &SharedSession) -> MutexGuard<'_, GameSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Autoplay {
    session: SharedSession,
    announcer: Arc<Announcer>,
    epoch: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl Autoplay {
    pub fn new(session: SharedSession, announcer: Arc<Announcer>) -> Self {
        Self {
            session,
            announcer,
            epoch: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Run `f` against the session under its lock.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut GameSession) -> T) -> T {
        let mut session = lock(&self.session);
        f(&mut *session)
    }

    pub fn is_running(&self) -> bool {
        lock(&self.session).is_running()
    }

    /// Draw now, then keep drawing every `delay` ms. Returns whether autoplay is running.
    pub fn start(&mut self) -> Result<bool, GameError> {
        let (outcome, delay) = {
            let mut session = lock(&self.session);
            if session.is_running() {
                return Ok(true);
            }
            if session.config().display_board_only {
                log_info("Autoplay is disabled in manual calling mode");
                return Ok(false);
            }
            let outcome = session.call_next()?;
            if !outcome.is_out_of_balls() {
                session.set_running(true);
            }
            (outcome, session.config().delay)
        };

        let out_of_balls = outcome.is_out_of_balls();
        self.announcer.dispatch(outcome.into_cues());
        if out_of_balls {
            return Ok(false);
        }
        self.schedule(delay);
        Ok(true)
    }

    /// Cancel the schedule and anything still waiting to be announced. Drawn balls stay drawn.
    pub fn stop(&mut self) {
        self.cancel_task();
        self.announcer.cancel_all();
        lock(&self.session).set_running(false);
    }

    pub fn toggle(&mut self) -> Result<bool, GameError> {
        if self.is_running() {
            self.stop();
            Ok(false)
        } else {
            self.start()
        }
    }

    /// New autoplay interval. A running schedule restarts with it; no extra draw happens.
    pub fn set_delay(&mut self, delay_ms: u64) {
        let delay_ms = delay_ms.max(1);
        let running = {
            let mut session = lock(&self.session);
            session.update_config(|config| config.delay = delay_ms);
            session.is_running()
        };
        if running {
            self.schedule(delay_ms);
        }
    }

    /// Switching manual calling mode on always stops autoplay.
    pub fn set_manual_mode(&mut self, on: bool) {
        if on {
            self.stop();
        }
        lock(&self.session).update_config(|config| config.display_board_only = on);
    }

    /// One operator-requested draw. Refused while the schedule is calling.
    pub fn call_next(&mut self) -> Result<DrawOutcome, GameError> {
        let outcome = {
            let mut session = lock(&self.session);
            if session.is_running() {
                return Err(GameError::AutoplayRunning);
            }
            session.call_next()?
        };
        if outcome.is_out_of_balls() {
            self.cancel_task();
        }
        self.announcer.dispatch(outcome.clone().into_cues());
        Ok(outcome)
    }

    pub fn toggle_ball(&mut self, number: Number) -> Result<ToggleOutcome, GameError> {
        lock(&self.session).toggle_ball(number)
    }

    /// Start a game: opening phrase, a pause for it, then the first draw. Wild bingo does
    /// its one bulk draw and leaves autoplay off; otherwise `autoplay` picks between a
    /// single call and starting the schedule.
    pub async fn begin(&mut self, autoplay: bool) -> Result<bool, GameError> {
        let (opening, wild, manual) = {
            let session = lock(&self.session);
            (session.opening_cue(), session.config().wild_bingo, session.config().display_board_only)
        };
        if manual {
            return Err(GameError::ManualModeActive);
        }

        if let Some(cue) = opening {
            self.announcer.dispatch(vec![cue]);
            tokio::time::sleep(START_CALL_DELAY).await;
        }

        if wild {
            let outcome = lock(&self.session).start_wild_bingo()?;
            self.announcer.dispatch(outcome.cues);
            return Ok(false);
        }
        if autoplay {
            self.start()
        } else {
            self.call_next()?;
            Ok(false)
        }
    }

    /// The play button: begin a game when nothing is called yet, else toggle autoplay.
    pub async fn play_pause(&mut self) -> Result<bool, GameError> {
        let started = lock(&self.session).has_game_started();
        if started {
            self.toggle()
        } else {
            self.begin(true).await
        }
    }

    /// Confirmed reset: nothing scheduled or pending may survive it.
    pub fn reset(&mut self) -> Vec<String> {
        self.cancel_task();
        self.announcer.cancel_all();
        let mut session = lock(&self.session);
        let components = session.reset();
        log_info(&format!("Reset to {}", session.game_info()));
        components
    }

    fn cancel_task(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }

    fn schedule(&mut self, delay_ms: u64) {
        self.cancel_task();
        let epoch = self.epoch.load(Ordering::SeqCst);
        let current_epoch = Arc::clone(&self.epoch);
        let session = Arc::clone(&self.session);
        let announcer = Arc::clone(&self.announcer);
        // interval_at panics on a zero period
        let period = Duration::from_millis(delay_ms.max(1));

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let (cues, finished) = {
                    let mut session = lock(&session);
                    if current_epoch.load(Ordering::SeqCst) != epoch {
                        break;
                    }
                    match session.call_next() {
                        Ok(outcome) => {
                            let finished = outcome.is_out_of_balls();
                            (outcome.into_cues(), finished)
                        }
                        Err(e) => {
                            log_error(&format!("Autoplay stopped: {e}"));
                            session.set_running(false);
                            break;
                        }
                    }
                };
                announcer.dispatch(cues);
                if finished {
                    break;
                }
            }
        }));
    }
}

impl Drop for Autoplay {
    fn drop(&mut self) {
        self.cancel_task();
    }
}
