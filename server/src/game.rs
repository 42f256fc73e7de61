use crate::entity::{Ball, Field, Paddle, Side};
use log::info;
use pong_shared::{
    Direction, GameStateView, Slot, StatusSnapshot, PADDLE_HEIGHT, PADDLE_MARGIN, PADDLE_WIDTH,
};
use rand::Rng;

/// The single authoritative match.
///
/// `game_active` is kept equal to `player1_connected && player2_connected`
/// by every presence mutation; nothing else writes it.
#[derive(Debug, Clone)]
pub struct MatchState {
    pub field: Field,
    pub paddle1: Paddle,
    pub paddle2: Paddle,
    pub ball: Ball,
    pub score1: u32,
    pub score2: u32,
    pub game_active: bool,
    pub player1_connected: bool,
    pub player2_connected: bool,
    /// Simulation steps performed on this match.
    pub tick: u64,
}

impl MatchState {
    /// Kickoff layout: paddles vertically centered `PADDLE_MARGIN` in from
    /// their own edge, ball launched from the center.
    pub fn new<R: Rng + ?Sized>(field: Field, rng: &mut R) -> Self {
        let paddle_y = field.height / 2.0 - PADDLE_HEIGHT / 2.0;

        let paddle1 = Paddle::new(PADDLE_MARGIN, paddle_y, Side::Left);
        let paddle2 = Paddle::new(
            field.width - PADDLE_MARGIN - PADDLE_WIDTH,
            paddle_y,
            Side::Right,
        );

        let mut ball = Ball::new(field);
        ball.reset(field, rng);

        Self {
            field,
            paddle1,
            paddle2,
            ball,
            score1: 0,
            score2: 0,
            game_active: false,
            player1_connected: false,
            player2_connected: false,
            tick: 0,
        }
    }

    pub fn paddle(&self, slot: Slot) -> &Paddle {
        match slot {
            Slot::Player1 => &self.paddle1,
            Slot::Player2 => &self.paddle2,
        }
    }

    pub fn paddle_mut(&mut self, slot: Slot) -> &mut Paddle {
        match slot {
            Slot::Player1 => &mut self.paddle1,
            Slot::Player2 => &mut self.paddle2,
        }
    }

    /// Updates one presence flag and re-derives `game_active`.
    /// Returns true if this call activated the match.
    pub fn set_connected(&mut self, slot: Slot, connected: bool) -> bool {
        match slot {
            Slot::Player1 => self.player1_connected = connected,
            Slot::Player2 => self.player2_connected = connected,
        }
        self.refresh_active()
    }

    /// Overwrites both presence flags, e.g. after a reset.
    /// Returns true if this call activated the match.
    pub fn sync_presence(&mut self, player1_connected: bool, player2_connected: bool) -> bool {
        self.player1_connected = player1_connected;
        self.player2_connected = player2_connected;
        self.refresh_active()
    }

    fn refresh_active(&mut self) -> bool {
        let was_active = self.game_active;
        self.game_active = self.player1_connected && self.player2_connected;

        if self.game_active != was_active {
            if self.game_active {
                info!("Both players connected, match active");
            } else {
                info!("Match paused");
            }
        }

        self.game_active && !was_active
    }

    pub fn apply_input(&mut self, slot: Slot, direction: Direction) {
        let field = self.field;
        self.paddle_mut(slot).shift(direction, field);
    }

    pub fn view(&self) -> GameStateView {
        GameStateView {
            canvas_width: self.field.width,
            canvas_height: self.field.height,
            paddle1: self.paddle1.view(),
            paddle2: self.paddle2.view(),
            ball: self.ball.view(),
            score1: self.score1,
            score2: self.score2,
            game_active: self.game_active,
            player1_connected: self.player1_connected,
            player2_connected: self.player2_connected,
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            game_active: self.game_active,
            player1_connected: self.player1_connected,
            player2_connected: self.player2_connected,
            score1: self.score1,
            score2: self.score2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_match() -> MatchState {
        MatchState::new(Field::default(), &mut StdRng::seed_from_u64(1))
    }

    #[test]
    fn test_initial_layout() {
        let state = new_match();

        assert_eq!((state.paddle1.x, state.paddle1.y), (20.0, 250.0));
        assert_eq!((state.paddle2.x, state.paddle2.y), (770.0, 250.0));
        assert_eq!(state.paddle1.side, Side::Left);
        assert_eq!(state.paddle2.side, Side::Right);
        assert_eq!((state.ball.x, state.ball.y), (400.0, 300.0));
        assert!(state.ball.velocity.magnitude() > 0.0);
        assert_eq!((state.score1, state.score2), (0, 0));
        assert!(!state.game_active);
        assert!(!state.player1_connected);
        assert!(!state.player2_connected);
    }

    #[test]
    fn test_initial_layout_follows_field() {
        let state = MatchState::new(Field::new(1000.0, 400.0), &mut StdRng::seed_from_u64(1));
        assert_eq!(state.paddle2.x, 970.0);
        assert_eq!(state.paddle1.y, 150.0);
        assert_eq!((state.ball.x, state.ball.y), (500.0, 200.0));
    }

    #[test]
    fn test_active_tracks_presence() {
        let mut state = new_match();

        assert!(!state.set_connected(Slot::Player1, true));
        assert!(!state.game_active);

        assert!(state.set_connected(Slot::Player2, true));
        assert!(state.game_active);

        // Already active: not a new activation edge.
        assert!(!state.set_connected(Slot::Player2, true));
        assert!(state.game_active);

        assert!(!state.set_connected(Slot::Player1, false));
        assert!(!state.game_active);
        assert!(state.player2_connected);
        assert!(!state.player1_connected);
    }

    #[test]
    fn test_sync_presence() {
        let mut state = new_match();
        assert!(state.sync_presence(true, true));
        assert!(state.game_active);
        assert!(!state.sync_presence(true, false));
        assert!(!state.game_active);
        assert!(state.player1_connected);
        assert!(!state.player2_connected);
    }

    #[test]
    fn test_apply_input_moves_only_that_paddle() {
        let mut state = new_match();
        state.apply_input(Slot::Player1, Direction::Down);
        assert_eq!(state.paddle1.y, 255.0);
        assert_eq!(state.paddle2.y, 250.0);

        state.apply_input(Slot::Player2, Direction::Left);
        assert_eq!(state.paddle2.x, 765.0);
        assert_eq!(state.paddle1.x, 20.0);
    }

    #[test]
    fn test_view_mirrors_state() {
        let mut state = new_match();
        state.score1 = 3;
        state.sync_presence(true, false);

        let view = state.view();
        assert_eq!(view.canvas_width, 800.0);
        assert_eq!(view.canvas_height, 600.0);
        assert_eq!(view.paddle1.y, state.paddle1.y);
        assert_eq!(view.paddle2.x, state.paddle2.x);
        assert_eq!(view.ball.x, state.ball.x);
        assert_eq!(view.ball.radius, 8.0);
        assert_eq!(view.score1, 3);
        assert!(view.player1_connected);
        assert!(!view.player2_connected);
        assert!(!view.game_active);
    }

    #[test]
    fn test_status() {
        let mut state = new_match();
        state.score2 = 4;
        state.sync_presence(true, true);

        let status = state.status();
        assert!(status.game_active);
        assert!(status.player1_connected);
        assert!(status.player2_connected);
        assert_eq!(status.score1, 0);
        assert_eq!(status.score2, 4);
    }
}
