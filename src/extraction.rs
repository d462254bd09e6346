// src/extraction.rs
// Core draw logic: the standard ball call with its skip/retry policy, and the one-shot
// wild bingo bulk marking.

use std::collections::BTreeSet;

use crate::announce::{ball_cues, game_over_cues, wild_cues, Cue};
use crate::defs::{Letter, Number, TOTAL_BALLS};
use crate::error::GameError;
use crate::game::GameSession;
use crate::logging::{log_info, log_warning};
use crate::pouch::{draw_any, draw_unused};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    /// `ball` was presented; `skipped` were called on the way but not presented.
    Called { ball: Number, skipped: Vec<Number>, cues: Vec<Cue> },
    /// Skip policy consumed the last balls; nothing presentable was left.
    Exhausted { skipped: Vec<Number> },
    /// Every ball was already called.
    OutOfBalls { cues: Vec<Cue> },
}

impl DrawOutcome {
    pub fn into_cues(self) -> Vec<Cue> {
        match self {
            DrawOutcome::Called { cues, .. } | DrawOutcome::OutOfBalls { cues } => cues,
            DrawOutcome::Exhausted { .. } => Vec::new(),
        }
    }

    pub fn is_out_of_balls(&self) -> bool {
        matches!(self, DrawOutcome::OutOfBalls { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildOutcome {
    pub wild_number: Number,
    /// None when the wild number had already been called.
    pub wild_ball: Option<Number>,
    /// Sub-matches marked called but not active, in scan order.
    pub marked: Vec<Number>,
    pub cues: Vec<Cue>,
}

fn skip_letters(session: &GameSession) -> BTreeSet<Letter> {
    if session.config.skip_unused && !session.pattern.is_placeholder() {
        session.pattern.unused_letters()
    } else {
        BTreeSet::new()
    }
}

fn finish_turn(session: &mut GameSession, previous: Option<Number>, current: Number) {
    session.previous_ball = previous;
    session.current_ball = Some(current);
    session.touch();
}

/// Standard draw. Balls of letters the pattern does not use are called and counted
/// but not presented, and the draw continues until a presentable ball comes out or
/// the board runs out.
pub fn call_bingo_number(session: &mut GameSession) -> Result<DrawOutcome, GameError> {
    if session.config.display_board_only {
        return Err(GameError::ManualModeActive);
    }

    if session.total_balls_called >= TOTAL_BALLS {
        session.running = false;
        session.total_balls_called = TOTAL_BALLS;
        session.previous_ball = session.current_ball;
        session.current_ball = None;
        session.touch();
        log_info(&format!("Game {}: out of balls to call", session.id));
        return Ok(DrawOutcome::OutOfBalls { cues: game_over_cues(&session.config) });
    }

    let skip = skip_letters(session);
    let previous = session.current_ball;
    let mut skipped = Vec::new();

    loop {
        let excluded = session.board.called_numbers();
        let number = match draw_unused(session.source.as_mut(), &excluded) {
            Ok(number) => number,
            Err(e) => {
                // Skipped balls are already on the board; keep the pointers consistent
                if let Some(&last) = skipped.last() {
                    finish_turn(session, previous, last);
                }
                return Err(e);
            }
        };

        session.board.clear_active();
        let Some(ball) = session.board.get_mut(number) else {
            return Err(GameError::UnknownBall(number));
        };
        if ball.called {
            // Collision: draw again without counting
            log_warning(&format!("Ball {number} drawn twice, drawing again"));
            continue;
        }

        ball.called = true;
        session.history.push(number);
        session.total_balls_called += 1;

        if skip.contains(&ball.letter) {
            skipped.push(number);
            if session.total_balls_called >= TOTAL_BALLS {
                finish_turn(session, previous, number);
                return Ok(DrawOutcome::Exhausted { skipped });
            }
            continue;
        }

        ball.active = true;
        let cues = ball_cues(ball, &session.config, &session.selected_chime);
        finish_turn(session, previous, number);
        debug_assert_eq!(session.history.len(), session.total_balls_called as usize);
        return Ok(DrawOutcome::Called { ball: number, skipped, cues });
    }
}

/// Wild bingo: one draw that marks the wild ball plus every uncalled ball sharing its
/// last digit (or its parity in evens/odds mode), as a single update.
pub fn start_wild_bingo(session: &mut GameSession) -> Result<WildOutcome, GameError> {
    if session.config.display_board_only {
        return Err(GameError::ManualModeActive);
    }

    let wild_number = draw_any(session.source.as_mut())?;
    let suffix = wild_number % 10;
    let parity = wild_number % 2;
    let evens_odds = session.config.evens_odds;

    session.board.clear_active();
    let mut wild_ball = None;
    let mut last_marked = None;
    let mut marked = Vec::new();
    let mut cues = Vec::new();

    for ball in session.board.balls_mut() {
        if ball.called {
            continue;
        }
        if ball.number == wild_number {
            ball.called = true;
            ball.active = true;
            wild_ball = Some(ball.number);
            cues = wild_cues(ball, &session.config, &session.selected_chime);
        } else if (!evens_odds && ball.number % 10 == suffix) || (evens_odds && ball.number % 2 == parity) {
            ball.called = true;
            last_marked = Some(ball.number);
            marked.push(ball.number);
        } else {
            continue;
        }
        session.history.push(ball.number);
        session.total_balls_called += 1;
    }

    session.current_ball = wild_ball;
    // Whichever sub-match came last in scan order
    session.previous_ball = last_marked;
    session.wild_ball = wild_ball;
    session.touch();

    log_info(&format!(
        "Game {}: wild number {} marked {} more balls",
        session.id,
        wild_number,
        marked.len()
    ));

    Ok(WildOutcome { wild_number, wild_ball, marked, cues })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::announce::{render, Effect, GAME_OVER_PHRASE};
    use crate::config::GameConfig;
    use crate::defs::{FIRSTNUMBER, LASTNUMBER};
    use crate::pattern::Pattern;
    use crate::pouch::testing::SeededSource;
    use crate::pouch::ScriptedSource;

    fn plain_config() -> GameConfig {
        GameConfig { skip_unused: false, ..GameConfig::default() }
    }

    fn scripted(config: GameConfig, bytes: &[u8]) -> GameSession {
        GameSession::new(config, Box::new(ScriptedSource::new(bytes.to_vec())))
    }

    fn only_b_unused() -> Pattern {
        Pattern::named("No B", [
            (Letter::I, [true; 5]),
            (Letter::N, [true; 5]),
            (Letter::G, [true; 5]),
            (Letter::O, [true; 5]),
        ])
    }

    #[test]
    fn test_standard_draw_marks_and_points() {
        let mut session = scripted(plain_config(), &[200, 12, 40]);

        let outcome = call_bingo_number(&mut session).unwrap();
        assert_eq!(outcome, DrawOutcome::Called { ball: 12, skipped: vec![], cues: vec![] });
        let ball = session.board.get(12).unwrap();
        assert!(ball.called && ball.active);
        assert_eq!(session.total_balls_called, 1);
        assert_eq!(session.current_ball, Some(12));
        assert_eq!(session.previous_ball, None);

        call_bingo_number(&mut session).unwrap();
        assert!(!session.board.get(12).unwrap().active);
        assert!(session.board.get(40).unwrap().active);
        assert_eq!(session.current_ball, Some(40));
        assert_eq!(session.previous_ball, Some(12));
        assert_eq!(session.history, vec![12, 40]);
    }

    #[test]
    fn test_full_game_calls_every_ball_once() {
        let mut session = GameSession::new(plain_config(), Box::new(SeededSource::new(75)));
        let mut seen = HashSet::new();
        for _ in 0..75 {
            match call_bingo_number(&mut session).unwrap() {
                DrawOutcome::Called { ball, skipped, .. } => {
                    assert!(skipped.is_empty());
                    assert!(seen.insert(ball));
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(seen.len(), 75);
        assert_eq!(session.total_balls_called, 75);
        assert_eq!(session.board.called_count(), 75);
        let last = session.current_ball;

        let outcome = call_bingo_number(&mut session).unwrap();
        assert!(outcome.is_out_of_balls());
        assert_eq!(session.total_balls_called, 75);
        assert_eq!(session.history.len(), 75);
        assert_eq!(session.current_ball, None);
        assert_eq!(session.previous_ball, last);
    }

    #[test]
    fn test_out_of_balls_stops_autoplay_and_announces() {
        let config = GameConfig { enable_caller: true, ..plain_config() };
        let mut session = GameSession::new(config, Box::new(SeededSource::new(3)));
        for _ in 0..75 {
            call_bingo_number(&mut session).unwrap();
        }
        session.running = true;
        let cues = call_bingo_number(&mut session).unwrap().into_cues();
        assert!(!session.running);
        assert_eq!(cues.len(), 1);
        match &cues[0].effect {
            Effect::Speak(parts) => assert_eq!(render(parts), GAME_OVER_PHRASE),
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn test_first_draw_is_uniform() {
        // Chi-square over the first ball of many games; 74 degrees of freedom
        const GAMES: usize = 7500;
        let mut source = SeededSource::new(2024);
        let mut counts = [0usize; 76];
        for _ in 0..GAMES {
            let n = draw_unused(&mut source, &HashSet::new()).unwrap();
            counts[n as usize] += 1;
        }
        let expected = GAMES as f64 / 75.0;
        let chi2: f64 = (FIRSTNUMBER..=LASTNUMBER)
            .map(|n| {
                let diff = counts[n as usize] as f64 - expected;
                diff * diff / expected
            })
            .sum();
        assert!(chi2 < 150.0, "chi-square {chi2} too large");
    }

    #[test]
    fn test_later_draws_are_uniform_over_remaining() {
        // Position of ball 1 in a full permutation should be uniform over 75 slots
        const GAMES: usize = 3000;
        let mut source = SeededSource::new(99);
        let mut positions = [0usize; 75];
        for _ in 0..GAMES {
            let mut called = HashSet::new();
            for position in 0..75 {
                let n = draw_unused(&mut source, &called).unwrap();
                called.insert(n);
                if n == 1 {
                    positions[position] += 1;
                }
            }
        }
        let expected = GAMES as f64 / 75.0;
        let chi2: f64 = positions.iter().map(|&c| (c as f64 - expected).powi(2) / expected).sum();
        assert!(chi2 < 150.0, "chi-square {chi2} too large");
    }

    #[test]
    fn test_skip_unused_letter() {
        let mut session = scripted(GameConfig::default(), &[7, 52]);
        session.pattern = only_b_unused();

        let outcome = call_bingo_number(&mut session).unwrap();
        assert_eq!(outcome, DrawOutcome::Called { ball: 52, skipped: vec![7], cues: vec![] });

        let skipped = session.board.get(7).unwrap();
        assert!(skipped.called);
        assert!(!skipped.active);
        assert!(session.board.get(52).unwrap().active);
        assert_eq!(session.total_balls_called, 2);
        assert_eq!(session.history, vec![7, 52]);
        assert_eq!(session.current_ball, Some(52));
        assert_eq!(session.previous_ball, None);
    }

    #[test]
    fn test_skip_needs_a_selected_pattern() {
        let mut session = scripted(GameConfig::default(), &[7]);
        // Placeholder pattern: nothing is skipped even though every letter is unused
        let outcome = call_bingo_number(&mut session).unwrap();
        assert!(matches!(outcome, DrawOutcome::Called { ball: 7, .. }));
    }

    #[test]
    fn test_skip_disabled_presents_unused_letter() {
        let mut session = scripted(plain_config(), &[7]);
        session.pattern = only_b_unused();
        let outcome = call_bingo_number(&mut session).unwrap();
        assert!(matches!(outcome, DrawOutcome::Called { ball: 7, .. }));
    }

    #[test]
    fn test_skipped_balls_fire_no_cues() {
        let config = GameConfig { enable_caller: true, chime: true, ..GameConfig::default() };
        let mut session = scripted(config, &[3, 70]);
        session.pattern = only_b_unused();
        let cues = call_bingo_number(&mut session).unwrap().into_cues();
        // One chime and one voice call, both for O 70
        assert_eq!(cues.len(), 2);
        match &cues[1].effect {
            Effect::Speak(parts) => assert_eq!(render(parts), "O 70"),
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn test_pattern_using_no_letter_drains_board() {
        let mut session = GameSession::new(GameConfig::default(), Box::new(SeededSource::new(5)));
        session.pattern = Pattern::named("Blank", Vec::<(Letter, [bool; 5])>::new());
        let outcome = call_bingo_number(&mut session).unwrap();
        match outcome {
            DrawOutcome::Exhausted { skipped } => assert_eq!(skipped.len(), 75),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(session.total_balls_called, 75);
        assert!(session.board.active_numbers().is_empty());
        assert_eq!(session.current_ball, session.history.last().copied());
        assert!(call_bingo_number(&mut session).unwrap().is_out_of_balls());
    }

    #[test]
    fn test_entropy_failure_is_surfaced() {
        let mut session = scripted(plain_config(), &[]);
        let result = call_bingo_number(&mut session);
        assert!(matches!(result, Err(GameError::EntropyUnavailable(_))));
        assert_eq!(session.total_balls_called, 0);
    }

    #[test]
    fn test_entropy_failure_after_skip_keeps_pointers() {
        let mut session = scripted(GameConfig::default(), &[4]);
        session.pattern = only_b_unused();
        assert!(call_bingo_number(&mut session).is_err());
        assert_eq!(session.total_balls_called, 1);
        assert_eq!(session.current_ball, Some(4));
    }

    #[test]
    fn test_draw_refused_in_manual_mode() {
        let config = GameConfig { display_board_only: true, ..GameConfig::default() };
        let mut session = scripted(config, &[1]);
        assert!(matches!(call_bingo_number(&mut session), Err(GameError::ManualModeActive)));
        assert!(matches!(start_wild_bingo(&mut session), Err(GameError::ManualModeActive)));
    }

    #[test]
    fn test_wild_digit_mode() {
        let config = GameConfig { wild_bingo: true, ..plain_config() };
        let mut session = scripted(config, &[23]);
        let outcome = start_wild_bingo(&mut session).unwrap();

        let expected: Vec<Number> = vec![3, 13, 33, 43, 53, 63, 73];
        assert_eq!(outcome.wild_number, 23);
        assert_eq!(outcome.wild_ball, Some(23));
        assert_eq!(outcome.marked, expected);
        assert_eq!(session.total_balls_called, 8);
        assert_eq!(session.history, vec![3, 13, 23, 33, 43, 53, 63, 73]);
        assert_eq!(session.board.active_numbers(), vec![23]);
        for n in &expected {
            let ball = session.board.get(*n).unwrap();
            assert!(ball.called && !ball.active);
        }
        assert_eq!(session.current_ball, Some(23));
        assert_eq!(session.wild_ball, Some(23));
        assert_eq!(session.previous_ball, Some(73));
    }

    #[test]
    fn test_wild_odd_mode() {
        let config = GameConfig { wild_bingo: true, evens_odds: true, ..plain_config() };
        let mut session = scripted(config, &[9]);
        let outcome = start_wild_bingo(&mut session).unwrap();
        assert_eq!(outcome.wild_ball, Some(9));
        assert_eq!(session.total_balls_called, 38);
        for ball in session.board.balls() {
            assert_eq!(ball.called, ball.number % 2 == 1, "ball {}", ball.number);
        }
        assert_eq!(session.previous_ball, Some(75));
    }

    #[test]
    fn test_wild_even_mode() {
        let config = GameConfig { wild_bingo: true, evens_odds: true, ..plain_config() };
        let mut session = scripted(config, &[250, 40]);
        let outcome = start_wild_bingo(&mut session).unwrap();
        assert_eq!(outcome.wild_number, 40);
        assert_eq!(outcome.marked.len(), 36);
        assert_eq!(session.total_balls_called, 37);
        for ball in session.board.balls() {
            assert_eq!(ball.called, ball.number % 2 == 0, "ball {}", ball.number);
        }
    }

    #[test]
    fn test_wild_skips_called_balls() {
        let config = GameConfig { wild_bingo: true, ..plain_config() };
        let mut session = scripted(config, &[13, 23]);
        call_bingo_number(&mut session).unwrap();
        let outcome = start_wild_bingo(&mut session).unwrap();
        assert!(!outcome.marked.contains(&13));
        // 13 counted once by the standard draw, 7 more by the wild draw
        assert_eq!(session.total_balls_called, 8);
        assert_eq!(session.history.iter().filter(|&&n| n == 13).count(), 1);
    }

    #[test]
    fn test_wild_ball_already_called() {
        let config = GameConfig { wild_bingo: true, ..plain_config() };
        let mut session = scripted(config, &[5, 5]);
        call_bingo_number(&mut session).unwrap();
        let outcome = start_wild_bingo(&mut session).unwrap();
        assert_eq!(outcome.wild_ball, None);
        assert!(outcome.cues.is_empty());
        assert_eq!(session.current_ball, None);
        assert_eq!(outcome.marked, vec![15, 25, 35, 45, 55, 65, 75]);
    }

    #[test]
    fn test_wild_announcement() {
        let config = GameConfig { wild_bingo: true, enable_caller: true, ..plain_config() };
        let mut session = scripted(config, &[47]);
        let outcome = start_wild_bingo(&mut session).unwrap();
        assert_eq!(outcome.cues.len(), 1);
        match &outcome.cues[0].effect {
            Effect::Speak(parts) => {
                assert_eq!(render(parts), "The wild number G 47 mark every number ending in 7")
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }
}
