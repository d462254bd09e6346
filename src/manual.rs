// src/manual.rs
// Manual calling mode: the operator marks and unmarks balls by hand. No announcements.

use crate::defs::Number;
use crate::error::GameError;
use crate::game::GameSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Marked(Number),
    Unmarked(Number),
}

pub fn toggle_ball(session: &mut GameSession, number: Number) -> Result<ToggleOutcome, GameError> {
    if !session.config.display_board_only {
        return Err(GameError::ManualModeDisabled);
    }
    if session.board.get(number).is_none() {
        return Err(GameError::UnknownBall(number));
    }

    session.board.clear_active();
    let Some(ball) = session.board.get_mut(number) else {
        return Err(GameError::UnknownBall(number));
    };

    let outcome = if ball.called {
        ball.called = false;
        session.history.retain(|&n| n != number);
        session.total_balls_called = session.total_balls_called.saturating_sub(1);
        if session.wild_ball == Some(number) {
            session.wild_ball = None;
        }
        // The new tail of the history, whatever it is
        session.previous_ball = session.history.last().copied();
        session.current_ball = None;
        ToggleOutcome::Unmarked(number)
    } else {
        ball.called = true;
        ball.active = true;
        session.history.push(number);
        session.total_balls_called += 1;
        session.previous_ball = session.current_ball;
        session.current_ball = Some(number);
        ToggleOutcome::Marked(number)
    };

    session.touch();
    Ok(outcome)
}
