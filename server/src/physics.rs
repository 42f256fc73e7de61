//! One fixed-timestep advance of the ball.
//!
//! The order inside a step is fixed: move, wall bounce, paddle bounce
//! (left then right), then the scoring check. Bounce and scoring both look
//! at the position computed by the move, so a ball that reaches the goal
//! line while still inside a paddle's vertical band is bounced *and*
//! scored in the same step.

use crate::game::MatchState;
use pong_shared::Slot;
use rand::Rng;

/// What a single step did to the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Match inactive, nothing changed.
    Paused,
    /// Ball advanced without a score.
    InPlay,
    /// The given slot scored and the ball was respawned.
    Scored(Slot),
}

/// Advances `state` by one tick. A no-op unless the match is active.
pub fn step<R: Rng + ?Sized>(state: &mut MatchState, rng: &mut R) -> StepOutcome {
    if !state.game_active {
        return StepOutcome::Paused;
    }

    state.tick += 1;

    let field = state.field;
    let ball = &mut state.ball;

    ball.update_position();

    // No position correction: a ball past the wall is simply sent back.
    if ball.y - ball.radius <= 0.0 || ball.y + ball.radius >= field.height {
        ball.reverse_y();
    }

    let left = &state.paddle1;
    if ball.left_edge() <= left.inner_edge() && left.spans_y(ball.y) && ball.velocity.x < 0.0 {
        ball.reverse_x();
    }

    let right = &state.paddle2;
    if ball.right_edge() >= right.inner_edge() && right.spans_y(ball.y) && ball.velocity.x > 0.0
    {
        ball.reverse_x();
    }

    if ball.left_edge() <= 0.0 {
        state.score2 += 1;
        ball.reset(field, rng);
        StepOutcome::Scored(Slot::Player2)
    } else if ball.right_edge() >= field.width {
        state.score1 += 1;
        ball.reset(field, rng);
        StepOutcome::Scored(Slot::Player1)
    } else {
        StepOutcome::InPlay
    }
}
