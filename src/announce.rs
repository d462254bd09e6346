// src/announce.rs
// What the caller says and when. The engine produces cues, the Announcer plays them
// through the voice and chime collaborators.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::board::Ball;
use crate::config::GameConfig;
use crate::defs::{Letter, Number, CHIME_LEAD, WILD_TALK_DELAY};

pub const START_PHRASE: &str = "Let's Play Bingo!";
pub const WILD_START_PHRASE: &str = "Let's Play Wild Bingo!";
pub const GAME_OVER_PHRASE: &str = "Someone better have a bingo because we have run out of balls to call!";

/// One piece of an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Letter(Letter),
    Number(Number),
    Digit(u8),
    Pause,
}

/// Flatten tokens into display text.
pub fn render(parts: &[Token]) -> String {
    let words: Vec<String> = parts
        .iter()
        .filter_map(|token| match token {
            Token::Text(text) => Some(text.trim().to_string()),
            Token::Letter(letter) => Some(letter.to_string()),
            Token::Number(number) => Some(number.to_string()),
            Token::Digit(digit) => Some(digit.to_string()),
            Token::Pause => None,
        })
        .filter(|word| !word.is_empty())
        .collect();
    words.join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Speak(Vec<Token>),
    Chime(String),
}

/// A side effect requested by the engine, to be played `after` the draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub after: Duration,
    pub effect: Effect,
}

impl Cue {
    pub fn now(effect: Effect) -> Self {
        Cue { after: Duration::ZERO, effect }
    }

    pub fn speak_text(text: &str) -> Self {
        Cue::now(Effect::Speak(vec![Token::Text(text.to_string())]))
    }
}

/// "B 12", or with double call "B 12, B 1 2".
pub fn ball_call(ball: &Ball, double_call: bool) -> Vec<Token> {
    let mut parts = vec![Token::Letter(ball.letter), Token::Number(ball.number)];
    if double_call {
        parts.extend([Token::Pause, Token::Pause, Token::Letter(ball.letter), Token::Pause]);
        if ball.number >= 10 {
            parts.extend([Token::Digit(ball.number / 10), Token::Pause, Token::Digit(ball.number % 10)]);
        } else {
            parts.push(Token::Number(ball.number));
        }
    }
    parts
}

/// Chatty explanation of the wild number and what it marks.
pub fn wild_talk(ball: &Ball, evens_odds: bool) -> Vec<Token> {
    let rule = if evens_odds {
        if ball.number % 2 == 1 { "mark every odd number".to_string() } else { "mark every even number".to_string() }
    } else {
        format!("mark every number ending in {}", ball.number % 10)
    };
    vec![
        Token::Text("The wild number".to_string()),
        Token::Pause,
        Token::Letter(ball.letter),
        Token::Pause,
        Token::Number(ball.number),
        Token::Pause,
        Token::Pause,
        Token::Text(rule),
    ]
}

fn chime_cue(config: &GameConfig, chime: &str) -> Option<Cue> {
    config.chime.then(|| Cue::now(Effect::Chime(chime.to_string())))
}

fn voice_lead(config: &GameConfig) -> Duration {
    if config.chime { CHIME_LEAD } else { Duration::ZERO }
}

/// Cues for a presented standard ball: chime first, voice after the chime lead.
pub fn ball_cues(ball: &Ball, config: &GameConfig, chime: &str) -> Vec<Cue> {
    let mut cues: Vec<Cue> = chime_cue(config, chime).into_iter().collect();
    if config.enable_caller {
        cues.push(Cue {
            after: voice_lead(config),
            effect: Effect::Speak(ball_call(ball, config.double_call)),
        });
    }
    cues
}

/// Cues for the wild ball. Sub-matches are never announced.
pub fn wild_cues(ball: &Ball, config: &GameConfig, chime: &str) -> Vec<Cue> {
    let mut cues: Vec<Cue> = chime_cue(config, chime).into_iter().collect();
    if config.enable_caller {
        let cue = if config.extra_talk {
            // Leave room for the opening phrase
            Cue { after: WILD_TALK_DELAY, effect: Effect::Speak(wild_talk(ball, config.evens_odds)) }
        } else {
            Cue { after: voice_lead(config), effect: Effect::Speak(ball_call(ball, config.double_call)) }
        };
        cues.push(cue);
    }
    cues
}

pub fn game_over_cues(config: &GameConfig) -> Vec<Cue> {
    if config.enable_caller { vec![Cue::speak_text(GAME_OVER_PHRASE)] } else { Vec::new() }
}

/// Opening phrase, spoken before the first draw when the caller is chatty.
pub fn opening_cue(config: &GameConfig) -> Option<Cue> {
    if !(config.enable_caller && config.extra_talk) {
        return None;
    }
    let phrase = if config.wild_bingo { WILD_START_PHRASE } else { START_PHRASE };
    Some(Cue::speak_text(phrase))
}

/// Voice collaborator. Each `speak` interrupts whatever was being said.
pub trait Caller: Send + Sync {
    fn speak(&self, parts: &[Token]);
    fn cancel(&self);
}

/// Chime collaborator.
pub trait ChimePlayer: Send + Sync {
    fn play(&self, chime: &str);
}

/// Caller and chime that do nothing, for headless sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Caller for Silent {
    fn speak(&self, _parts: &[Token]) {}
    fn cancel(&self) {}
}

impl ChimePlayer for Silent {
    fn play(&self, _chime: &str) {}
}

/// Plays cues, holding delayed ones on tokio timers until they are due or cancelled.
pub struct Announcer {
    caller: Arc<dyn Caller>,
    chime: Arc<dyn ChimePlayer>,
    epoch: Arc<AtomicU64>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Announcer {
    pub fn new(caller: Arc<dyn Caller>, chime: Arc<dyn ChimePlayer>) -> Self {
        Self {
            caller,
            chime,
            epoch: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn silent() -> Self {
        Self::new(Arc::new(Silent), Arc::new(Silent))
    }

    pub fn dispatch(&self, cues: Vec<Cue>) {
        for cue in cues {
            if cue.after.is_zero() {
                fire(self.caller.as_ref(), self.chime.as_ref(), &cue.effect);
                continue;
            }
            let Ok(runtime) = Handle::try_current() else {
                // No timer available: play it right away rather than drop it
                fire(self.caller.as_ref(), self.chime.as_ref(), &cue.effect);
                continue;
            };
            let epoch = self.epoch.load(Ordering::SeqCst);
            let current_epoch = Arc::clone(&self.epoch);
            let caller = Arc::clone(&self.caller);
            let chime = Arc::clone(&self.chime);
            let handle = runtime.spawn(async move {
                tokio::time::sleep(cue.after).await;
                if current_epoch.load(Ordering::SeqCst) == epoch {
                    fire(caller.as_ref(), chime.as_ref(), &cue.effect);
                }
            });
            if let Ok(mut pending) = self.pending.lock() {
                pending.retain(|h| !h.is_finished());
                pending.push(handle);
            }
        }
    }

    /// Drop every pending cue and silence the caller.
    pub fn cancel_all(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut pending) = self.pending.lock() {
            for handle in pending.drain(..) {
                handle.abort();
            }
        }
        self.caller.cancel();
    }

    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .map(|pending| pending.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }
}

fn fire(caller: &dyn Caller, chime: &dyn ChimePlayer, effect: &Effect) {
    match effect {
        Effect::Speak(parts) => caller.speak(parts),
        Effect::Chime(id) => chime.play(id),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Recorder;
    use super::*;
    use crate::board::Board;

    fn caller_config() -> GameConfig {
        GameConfig { enable_caller: true, ..GameConfig::default() }
    }

    #[test]
    fn test_single_call() {
        let board = Board::new();
        let parts = ball_call(board.get(42).unwrap(), false);
        assert_eq!(parts, vec![Token::Letter(Letter::G), Token::Number(42)]);
        assert_eq!(render(&parts), "G 42");
    }

    #[test]
    fn test_double_call_splits_digits() {
        let board = Board::new();
        assert_eq!(render(&ball_call(board.get(42).unwrap(), true)), "G 42 G 4 2");
        assert_eq!(render(&ball_call(board.get(7).unwrap(), true)), "B 7 B 7");
    }

    #[test]
    fn test_wild_talk_rules() {
        let board = Board::new();
        assert_eq!(render(&wild_talk(board.get(23).unwrap(), false)), "The wild number I 23 mark every number ending in 3");
        assert_eq!(render(&wild_talk(board.get(23).unwrap(), true)), "The wild number I 23 mark every odd number");
        assert_eq!(render(&wild_talk(board.get(64).unwrap(), true)), "The wild number O 64 mark every even number");
    }

    #[test]
    fn test_ball_cues_chime_before_voice() {
        let board = Board::new();
        let config = GameConfig { chime: true, ..caller_config() };
        let cues = ball_cues(board.get(5).unwrap(), &config, "Chime 3");
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0], Cue::now(Effect::Chime("Chime 3".to_string())));
        assert_eq!(cues[1].after, CHIME_LEAD);
    }

    #[test]
    fn test_ball_cues_respect_flags() {
        let board = Board::new();
        let ball = board.get(5).unwrap();
        assert!(ball_cues(ball, &GameConfig::default(), "Chime 1").is_empty());
        let cues = ball_cues(ball, &caller_config(), "Chime 1");
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].after, Duration::ZERO);
    }

    #[test]
    fn test_wild_cues() {
        let board = Board::new();
        let ball = board.get(23).unwrap();
        let chatty = wild_cues(ball, &caller_config(), "Chime 1");
        assert_eq!(chatty.len(), 1);
        assert_eq!(chatty[0].after, WILD_TALK_DELAY);

        let quiet = GameConfig { extra_talk: false, double_call: true, ..caller_config() };
        let cues = wild_cues(ball, &quiet, "Chime 1");
        assert_eq!(cues[0], Cue::now(Effect::Speak(ball_call(ball, true))));
    }

    #[test]
    fn test_opening_cue() {
        assert!(opening_cue(&GameConfig::default()).is_none());
        assert_eq!(opening_cue(&caller_config()), Some(Cue::speak_text(START_PHRASE)));
        let wild = GameConfig { wild_bingo: true, ..caller_config() };
        assert_eq!(opening_cue(&wild), Some(Cue::speak_text(WILD_START_PHRASE)));
        let terse = GameConfig { extra_talk: false, ..caller_config() };
        assert!(opening_cue(&terse).is_none());
    }

    #[test]
    fn test_dispatch_without_runtime_plays_immediately() {
        let recorder = Arc::new(Recorder::default());
        let announcer = Announcer::new(recorder.clone(), recorder.clone());
        announcer.dispatch(vec![
            Cue::now(Effect::Chime("Chime 2".to_string())),
            Cue { after: CHIME_LEAD, effect: Effect::Speak(vec![Token::Text("hello".to_string())]) },
        ]);
        assert_eq!(recorder.chimes(), vec!["Chime 2".to_string()]);
        assert_eq!(recorder.spoken(), vec!["hello".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_cue_plays_after_lead() {
        let recorder = Arc::new(Recorder::default());
        let announcer = Announcer::new(recorder.clone(), recorder.clone());
        announcer.dispatch(vec![Cue { after: CHIME_LEAD, effect: Effect::Speak(vec![Token::Number(9)]) }]);
        assert!(recorder.spoken().is_empty());
        tokio::time::sleep(CHIME_LEAD + Duration::from_millis(10)).await;
        assert_eq!(recorder.spoken(), vec!["9".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_drops_pending_cues() {
        let recorder = Arc::new(Recorder::default());
        let announcer = Announcer::new(recorder.clone(), recorder.clone());
        announcer.dispatch(vec![Cue { after: WILD_TALK_DELAY, effect: Effect::Speak(vec![Token::Number(1)]) }]);
        assert_eq!(announcer.pending(), 1);
        announcer.cancel_all();
        tokio::time::sleep(WILD_TALK_DELAY * 2).await;
        assert!(recorder.spoken().is_empty());
        assert_eq!(*recorder.cancels.lock().unwrap(), 1);
        assert_eq!(announcer.pending(), 0);
    }
}
