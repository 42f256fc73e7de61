//! # Pong Server Library
//!
//! This library provides the authoritative server for a two-player pong match
//! played over WebSockets. The server owns the only copy of the match,
//! advances it at a fixed tick rate and streams the full state to both
//! players after every step.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Ball movement, wall and paddle bounces and scoring all run here. Clients
//! only send paddle commands and draw whatever state they are sent.
//!
//! ### Slot Management
//! There are exactly two player slots, `player1` and `player2`. Each slot is
//! held by at most one live connection:
//! - A connection names its slot in the URL and is refused if the name is
//!   unknown or the slot is taken
//! - The match runs only while both slots are held
//! - A dropped connection frees its slot and pauses the match
//!
//! ### State Broadcasting
//! After every simulation step the complete match is serialized to JSON and
//! queued for every bound connection. Connections whose queue has closed or
//! filled up are swept out during the broadcast and the remaining player is
//! told.
//!
//! ## Architecture Design
//!
//! ### Single Lock
//! Registry and match live together in a [`session::Session`] guarded by one
//! lock inside the [`coordinator::GameCoordinator`]. Inputs, steps and resets
//! each take that lock once, so they are applied in a total order.
//!
//! ### Per-Connection Tasks
//! Every accepted socket gets a reader (the connection handler) and a writer
//! that drains a bounded outbound queue. The simulation never awaits on a
//! socket; a client that stops reading fills its queue and is dropped.
//!
//! ### Lazy Game Loop
//! The loop is spawned the first time both players are present and keeps
//! polling afterwards, stepping only while the match is active. It holds a
//! weak reference to the coordinator and ends when the coordinator is dropped.
//!
//! ## Module Organization
//!
//! ### Entity Module (`entity`)
//! Paddles, the ball and the field dimensions, with clamped paddle movement.
//!
//! ### Game Module (`game`)
//! The [`game::MatchState`] with scores and presence flags.
//!
//! ### Physics Module (`physics`)
//! The fixed-order simulation step.
//!
//! ### Client Manager Module (`client_manager`)
//! The slot to connection registry and its outbound queues.
//!
//! ### Session and Coordinator Modules (`session`, `coordinator`)
//! Bind, unbind, input, reset, tick and broadcast over the shared state.
//!
//! ### Game Loop Module (`game_loop`)
//! The fixed-rate driver.
//!
//! ### Network Module (`network`)
//! TCP accept loop, the `/status` endpoint, WebSocket handshake and routing,
//! frame decoding.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pong_server::config::ServerConfig;
//! use pong_server::coordinator::GameCoordinator;
//! use pong_server::network::NetworkServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let coordinator = GameCoordinator::new(&config);
//!
//!     // Players connect to ws://127.0.0.1:8080/ws/player1 and /ws/player2
//!     let server = NetworkServer::bind(&config.bind_addr, coordinator).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod game;
pub mod game_loop;
pub mod network;
pub mod physics;
pub mod session;
