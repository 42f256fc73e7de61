//! Shared entry point for connection handlers and the game loop
//!
//! All state lives in one [`Session`] behind a single lock. Every operation
//! takes the lock once, so an input can never land halfway through a step
//! and a reset never interleaves with a broadcast.

use crate::client_manager::{ConnectionId, Outbound};
use crate::config::ServerConfig;
use crate::error::BindError;
use crate::game_loop;
use crate::physics::StepOutcome;
use crate::session::{Bound, Session};
use log::{debug, info};
use pong_shared::{GameStateView, ServerMessage, Slot, StatusSnapshot};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

pub struct GameCoordinator {
    session: RwLock<Session>,
    tick_duration: Duration,
    game_loop: Mutex<Option<JoinHandle<()>>>,
    next_connection_id: AtomicU32,
}

impl GameCoordinator {
    pub fn new(config: &ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            session: RwLock::new(Session::new(config.field, config.seed)),
            tick_duration: config.tick_duration(),
            game_loop: Mutex::new(None),
            next_connection_id: AtomicU32::new(1),
        })
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Direct access to the guarded state, mainly for diagnostics and tests.
    pub fn session(&self) -> &RwLock<Session> {
        &self.session
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Claims `slot` for a new connection. Starts the game loop when this
    /// bind brings the second player in.
    pub async fn bind(
        self: &Arc<Self>,
        slot: &str,
        id: ConnectionId,
        addr: SocketAddr,
        sender: Outbound,
    ) -> Result<Slot, BindError> {
        let Bound { slot, activated } = {
            let mut session = self.session.write().await;
            session.bind(slot, id, addr, sender)?
        };

        if activated {
            self.ensure_game_loop().await;
        }
        Ok(slot)
    }

    /// Frees `slot` regardless of owner. Idempotent; sends nothing.
    pub async fn unbind(&self, slot: Slot) -> bool {
        self.session.write().await.unbind(slot)
    }

    /// Cleanup for a closed connection: frees the slot if `id` still holds
    /// it and tells the remaining player.
    pub async fn disconnect(&self, slot: Slot, id: ConnectionId) {
        let mut session = self.session.write().await;
        if session.unbind_connection(slot, id) {
            info!("{} disconnected", slot);
            session.broadcast(&ServerMessage::player_disconnected(slot));
        } else {
            debug!("Connection {} for {} was already released", id, slot);
        }
    }

    pub async fn apply_input(&self, slot: &str, action: &str) {
        self.session.write().await.apply_input(slot, action);
    }

    /// Starts a fresh match and pushes it to everyone.
    pub async fn reset(self: &Arc<Self>) {
        let active = {
            let mut session = self.session.write().await;
            let active = session.reset();
            session.broadcast_game_state();
            active
        };

        if active {
            self.ensure_game_loop().await;
        }
    }

    /// One loop iteration: step, then broadcast if the match is running.
    pub async fn tick(&self) -> StepOutcome {
        let mut session = self.session.write().await;
        let outcome = session.step();
        if outcome != StepOutcome::Paused {
            session.broadcast_game_state();
        }
        outcome
    }

    pub async fn status(&self) -> StatusSnapshot {
        self.session.read().await.status()
    }

    pub async fn snapshot(&self) -> Option<GameStateView> {
        self.session.read().await.game().map(|game| game.view())
    }

    /// Spawns the game loop unless one is already running. Returns true if
    /// a new loop was started.
    pub async fn ensure_game_loop(self: &Arc<Self>) -> bool {
        let mut handle = self.game_loop.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        *handle = Some(game_loop::spawn_game_loop(self));
        true
    }

    pub async fn is_game_loop_running(&self) -> bool {
        self.game_loop
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stops the game loop. Connections are left to the network layer.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.game_loop.lock().await.take() {
            handle.abort();
            info!("Game loop stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_manager::OUTBOUND_CAPACITY;
    use crate::entity::Vector2;
    use tokio::sync::mpsc;
    use tokio::time::sleep;
    use tokio_test::{assert_err, assert_ok};
    use tokio_tungstenite::tungstenite::Message;

    type Inbox = mpsc::Receiver<Message>;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:9100".parse().unwrap()
    }

    fn coordinator() -> Arc<GameCoordinator> {
        GameCoordinator::new(&ServerConfig {
            tick_rate: 200,
            seed: Some(3),
            ..ServerConfig::default()
        })
    }

    async fn bind(
        coordinator: &Arc<GameCoordinator>,
        slot: &str,
    ) -> (Result<Slot, BindError>, Inbox) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let id = coordinator.next_connection_id();
        (coordinator.bind(slot, id, test_addr(), tx).await, rx)
    }

    fn drain(inbox: &mut Inbox) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(Message::Text(text)) = inbox.try_recv() {
            messages.push(serde_json::from_str(&text).unwrap());
        }
        messages
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let coordinator = coordinator();
        let a = coordinator.next_connection_id();
        let b = coordinator.next_connection_id();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_status_before_any_bind() {
        let coordinator = coordinator();
        assert_eq!(coordinator.status().await, StatusSnapshot::default());
        assert!(coordinator.snapshot().await.is_none());
        assert!(!coordinator.is_game_loop_running().await);
    }

    #[tokio::test]
    async fn test_bind_rejections() {
        let coordinator = coordinator();

        let (result, _inbox) = bind(&coordinator, "player3").await;
        assert_err!(result);

        let (result, _first) = bind(&coordinator, "player1").await;
        assert_eq!(assert_ok!(result), Slot::Player1);

        let (result, _second) = bind(&coordinator, "player1").await;
        assert_eq!(result, Err(BindError::SlotTaken(Slot::Player1)));
    }

    #[tokio::test]
    async fn test_second_bind_starts_loop() {
        let coordinator = coordinator();
        let (_, _inbox1) = bind(&coordinator, "player1").await;
        assert!(!coordinator.is_game_loop_running().await);

        let (_, mut inbox2) = bind(&coordinator, "player2").await;
        assert!(coordinator.is_game_loop_running().await);

        sleep(Duration::from_millis(100)).await;

        let ticks = coordinator.session().read().await.game().unwrap().tick;
        assert!(ticks > 0);

        let states = drain(&mut inbox2)
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::GameState { .. }))
            .count();
        assert!(states > 1);

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_ensure_game_loop_is_idempotent() {
        let coordinator = coordinator();
        assert!(coordinator.ensure_game_loop().await);
        assert!(!coordinator.ensure_game_loop().await);
        assert!(coordinator.is_game_loop_running().await);

        coordinator.shutdown().await;
        sleep(Duration::from_millis(20)).await;
        assert!(!coordinator.is_game_loop_running().await);
    }

    #[tokio::test]
    async fn test_tick_while_paused_sends_nothing() {
        let coordinator = coordinator();
        let (_, mut inbox) = bind(&coordinator, "player1").await;
        drain(&mut inbox);

        assert_eq!(coordinator.tick().await, StepOutcome::Paused);
        assert!(drain(&mut inbox).is_empty());
    }

    #[tokio::test]
    async fn test_tick_broadcasts_when_active() {
        let coordinator = coordinator();
        let (_, mut inbox1) = bind(&coordinator, "player1").await;
        let (_, mut inbox2) = bind(&coordinator, "player2").await;
        coordinator.shutdown().await;
        drain(&mut inbox1);
        drain(&mut inbox2);

        {
            let mut session = coordinator.session().write().await;
            let game = session.game_mut().unwrap();
            game.ball.x = 400.0;
            game.ball.y = 300.0;
            game.ball.velocity = Vector2::new(3.0, 0.0);
        }

        assert_eq!(coordinator.tick().await, StepOutcome::InPlay);
        for inbox in [&mut inbox1, &mut inbox2] {
            let messages = drain(inbox);
            assert_eq!(messages.len(), 1);
            match &messages[0] {
                ServerMessage::GameState { data } => assert_eq!(data.ball.x, 403.0),
                other => panic!("unexpected message {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_disconnect_notifies_remaining_player() {
        let coordinator = coordinator();
        let (tx, _inbox1) = mpsc::channel(OUTBOUND_CAPACITY);
        let id = coordinator.next_connection_id();
        assert_ok!(coordinator.bind("player1", id, test_addr(), tx).await);
        let (_, mut inbox2) = bind(&coordinator, "player2").await;
        coordinator.shutdown().await;
        drain(&mut inbox2);

        coordinator.disconnect(Slot::Player1, id).await;

        let messages = drain(&mut inbox2);
        assert_eq!(messages, vec![ServerMessage::player_disconnected(Slot::Player1)]);
        let status = coordinator.status().await;
        assert!(!status.game_active);
        assert!(!status.player1_connected);
        assert!(status.player2_connected);

        // A second cleanup for the same connection is silent.
        coordinator.disconnect(Slot::Player1, id).await;
        assert!(drain(&mut inbox2).is_empty());
    }

    #[tokio::test]
    async fn test_unbind_is_silent_and_idempotent() {
        let coordinator = coordinator();
        let (_, mut inbox1) = bind(&coordinator, "player1").await;
        let (_, _inbox2) = bind(&coordinator, "player2").await;
        coordinator.shutdown().await;
        drain(&mut inbox1);

        assert!(coordinator.unbind(Slot::Player2).await);
        assert!(!coordinator.unbind(Slot::Player2).await);
        assert!(drain(&mut inbox1).is_empty());
        assert!(!coordinator.status().await.game_active);
    }

    #[tokio::test]
    async fn test_reset_broadcasts_fresh_match() {
        let coordinator = coordinator();
        let (_, mut inbox1) = bind(&coordinator, "player1").await;
        {
            let mut session = coordinator.session().write().await;
            session.game_mut().unwrap().score2 = 6;
        }
        drain(&mut inbox1);

        coordinator.reset().await;

        let messages = drain(&mut inbox1);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            ServerMessage::GameState { data } => {
                assert_eq!(data.score2, 0);
                assert!(data.player1_connected);
                assert!(!data.game_active);
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert!(!coordinator.is_game_loop_running().await);
    }

    #[tokio::test]
    async fn test_reset_with_both_players_restarts_loop() {
        let coordinator = coordinator();
        let (_, _inbox1) = bind(&coordinator, "player1").await;
        let (_, _inbox2) = bind(&coordinator, "player2").await;
        coordinator.shutdown().await;
        assert!(!coordinator.is_game_loop_running().await);

        coordinator.reset().await;
        assert!(coordinator.is_game_loop_running().await);
        assert!(coordinator.status().await.game_active);

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_apply_input_through_coordinator() {
        let coordinator = coordinator();
        let (_, _inbox) = bind(&coordinator, "player2").await;

        coordinator.apply_input("player2", "UP").await;
        coordinator.apply_input("player2", "SIDEWAYS").await;

        let view = coordinator.snapshot().await.unwrap();
        assert_eq!(view.paddle2.y, 245.0);
    }
}
