use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const CANVAS_WIDTH: f32 = 800.0;
pub const CANVAS_HEIGHT: f32 = 600.0;
pub const PADDLE_WIDTH: f32 = 10.0;
pub const PADDLE_HEIGHT: f32 = 100.0;
pub const PADDLE_SPEED: f32 = 5.0;
/// Gap between a paddle's outer edge and its own side of the field at kickoff.
pub const PADDLE_MARGIN: f32 = 20.0;
pub const BALL_RADIUS: f32 = 8.0;
pub const BALL_SPEED: f32 = 3.0;
pub const TICK_RATE: u32 = 60;

/// One of the two fixed identities a connection can claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Player1,
    Player2,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Player1, Slot::Player2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Player1 => "player1",
            Slot::Player2 => "player2",
        }
    }

    pub fn opponent(&self) -> Slot {
        match self {
            Slot::Player1 => Slot::Player2,
            Slot::Player2 => Slot::Player1,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown player slot `{0}`")]
pub struct ParseSlotError(pub String);

impl FromStr for Slot {
    type Err = ParseSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player1" => Ok(Slot::Player1),
            "player2" => Ok(Slot::Player2),
            other => Err(ParseSlotError(other.to_string())),
        }
    }
}

/// Paddle movement requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action `{0}`")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(Direction::Up),
            "DOWN" => Ok(Direction::Down),
            "LEFT" => Ok(Direction::Left),
            "RIGHT" => Ok(Direction::Right),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// Messages a client may send once bound to a slot.
///
/// The action is kept as a raw string so that an unknown action is still a
/// well-formed message and can be dropped by the server without an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Input {
        #[serde(default)]
        action: Option<String>,
    },
    Reset,
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn input(direction: Direction) -> Self {
        ClientMessage::Input {
            action: Some(direction.as_str().to_string()),
        }
    }
}

/// Messages pushed from the server to bound connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected { player_id: Slot, message: String },
    GameState { data: GameStateView },
    PlayerDisconnected { player_id: Slot, message: String },
}

impl ServerMessage {
    pub fn connected(slot: Slot) -> Self {
        ServerMessage::Connected {
            player_id: slot,
            message: format!("Connected as {}", slot),
        }
    }

    pub fn player_disconnected(slot: Slot) -> Self {
        ServerMessage::PlayerDisconnected {
            player_id: slot,
            message: format!("{} disconnected", slot),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddleView {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallView {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Canonical serialized form of the match, sent in every `game_state` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateView {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub paddle1: PaddleView,
    pub paddle2: PaddleView,
    pub ball: BallView,
    pub score1: u32,
    pub score2: u32,
    pub game_active: bool,
    pub player1_connected: bool,
    pub player2_connected: bool,
}

impl GameStateView {
    pub fn paddle(&self, slot: Slot) -> &PaddleView {
        match slot {
            Slot::Player1 => &self.paddle1,
            Slot::Player2 => &self.paddle2,
        }
    }
}

/// Read-only summary of the match. Defaults to the "no match yet" values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub game_active: bool,
    pub player1_connected: bool,
    pub player2_connected: bool,
    pub score1: u32,
    pub score2: u32,
}
