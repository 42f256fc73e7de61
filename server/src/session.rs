//! Registry plus match, mutated as one unit
//!
//! `Session` is plain synchronous state. The coordinator wraps it in a single
//! lock so that input application, simulation steps and resets are
//! linearized.

use crate::client_manager::{Client, ClientManager, ConnectionId, Outbound};
use crate::entity::Field;
use crate::error::BindError;
use crate::game::MatchState;
use crate::physics::{self, StepOutcome};
use log::{debug, info, warn};
use pong_shared::{Direction, ServerMessage, Slot, StatusSnapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use tokio_tungstenite::tungstenite::Message;

/// Result of a successful bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    pub slot: Slot,
    /// True if this bind made both slots present.
    pub activated: bool,
}

pub struct Session {
    clients: ClientManager,
    game: Option<MatchState>,
    field: Field,
    rng: StdRng,
}

/// Serializes a server message into a text frame.
pub fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::text(json)),
        Err(e) => {
            warn!("Failed to serialize server message: {}", e);
            None
        }
    }
}

impl Session {
    pub fn new(field: Field, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            clients: ClientManager::new(),
            game: None,
            field,
            rng,
        }
    }

    pub fn game(&self) -> Option<&MatchState> {
        self.game.as_ref()
    }

    pub fn game_mut(&mut self) -> Option<&mut MatchState> {
        self.game.as_mut()
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    pub fn is_active(&self) -> bool {
        self.game.as_ref().is_some_and(|game| game.game_active)
    }

    /// Claims `slot` for a connection and greets it with `connected` and the
    /// current `game_state`.
    pub fn bind(
        &mut self,
        slot: &str,
        id: ConnectionId,
        addr: SocketAddr,
        sender: Outbound,
    ) -> Result<Bound, BindError> {
        let slot: Slot = slot
            .parse()
            .map_err(|_| BindError::InvalidSlot(slot.to_string()))?;

        self.clients.add_client(Client::new(id, slot, addr, sender))?;

        if self.game.is_none() {
            info!("Creating match for first connection");
        }
        let field = self.field;
        let rng = &mut self.rng;
        let game = self.game.get_or_insert_with(|| MatchState::new(field, rng));
        let activated = game.set_connected(slot, true);

        if let Some(frame) = encode(&ServerMessage::connected(slot)) {
            self.clients.send_to(slot, frame);
        }
        if let Some(frame) = self.game_state_frame() {
            self.clients.send_to(slot, frame);
        }

        Ok(Bound { slot, activated })
    }

    /// Releases `slot` regardless of which connection holds it. Idempotent.
    /// Returns true if a binding was removed.
    pub fn unbind(&mut self, slot: Slot) -> bool {
        let removed = self.clients.remove_client(slot).is_some();
        self.mark_absent(slot);
        removed
    }

    /// Releases `slot` only if connection `id` still holds it.
    pub fn unbind_connection(&mut self, slot: Slot, id: ConnectionId) -> bool {
        if self.clients.remove_connection(slot, id).is_some() {
            self.mark_absent(slot);
            true
        } else {
            false
        }
    }

    fn mark_absent(&mut self, slot: Slot) {
        if let Some(game) = self.game.as_mut() {
            game.set_connected(slot, false);
        }
    }

    /// Moves the slot's paddle. Unknown slots, unknown actions and a missing
    /// match are ignored without error.
    pub fn apply_input(&mut self, slot: &str, action: &str) {
        let parsed = (slot.parse::<Slot>(), action.parse::<Direction>());
        let (Ok(slot), Ok(direction)) = parsed else {
            debug!("Ignoring input {:?} for {:?}", action, slot);
            return;
        };

        if let Some(game) = self.game.as_mut() {
            game.apply_input(slot, direction);
        }
    }

    /// Replaces the match with a fresh one whose presence flags mirror the
    /// registry. Returns true if the new match is active.
    pub fn reset(&mut self) -> bool {
        let mut game = MatchState::new(self.field, &mut self.rng);
        game.sync_presence(
            self.clients.is_bound(Slot::Player1),
            self.clients.is_bound(Slot::Player2),
        );
        let active = game.game_active;
        self.game = Some(game);
        info!("Match reset (active: {})", active);
        active
    }

    /// Runs one simulation step if the match is active.
    pub fn step(&mut self) -> StepOutcome {
        let Some(game) = self.game.as_mut() else {
            return StepOutcome::Paused;
        };

        let outcome = physics::step(game, &mut self.rng);
        match outcome {
            StepOutcome::Scored(slot) => {
                info!("{} scored ({} - {})", slot, game.score1, game.score2)
            }
            StepOutcome::InPlay if game.tick % 60 == 0 => {
                debug!(
                    "Tick {}: ball ({:.1}, {:.1}), score {} - {}",
                    game.tick, game.ball.x, game.ball.y, game.score1, game.score2
                );
            }
            _ => {}
        }
        outcome
    }

    pub fn game_state_frame(&self) -> Option<Message> {
        let game = self.game.as_ref()?;
        encode(&ServerMessage::GameState { data: game.view() })
    }

    /// Delivers `message` to every bound connection, then unbinds each peer
    /// found gone or stalled and tells the others, once per peer.
    pub fn broadcast(&mut self, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };

        let mut failed = self.clients.broadcast(&frame);
        while !failed.is_empty() {
            let mut notices = Vec::new();
            for slot in failed {
                if self.clients.get(slot).is_some_and(|client| client.is_closed()) {
                    warn!("{} is gone, dropping connection", slot);
                } else {
                    warn!("{} stopped reading, dropping connection", slot);
                }
                if self.unbind(slot) {
                    notices.push(slot);
                }
            }

            failed = Vec::new();
            for slot in notices {
                if let Some(frame) = encode(&ServerMessage::player_disconnected(slot)) {
                    failed.extend(self.clients.broadcast(&frame));
                }
            }
        }
    }

    pub fn broadcast_game_state(&mut self) {
        if let Some(game) = self.game.as_ref() {
            let message = ServerMessage::GameState { data: game.view() };
            self.broadcast(&message);
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        self.game
            .as_ref()
            .map(MatchState::status)
            .unwrap_or_default()
    }
}
