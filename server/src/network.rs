//! WebSocket transport: one task pair per connection
//!
//! Clients connect to `/ws/{player_id}`. After the handshake the connection
//! is bound to its slot through the coordinator; a refused bind is answered
//! with a policy-violation close frame. A plain `GET` for a path ending in
//! `/status` is answered with the JSON status snapshot and closed. A bound connection gets a writer task
//! that drains its outbound queue into the socket while the handler reads
//! inbound frames until the peer goes away.

use crate::client_manager::OUTBOUND_CAPACITY;
use crate::coordinator::GameCoordinator;
use crate::error::ServerError;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use pong_shared::{ClientMessage, Slot};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};

const ROUTE_PREFIX: &str = "/ws/";
const STATUS_SUFFIX: &str = "/status";

/// Largest request head read before a request is classified or answered.
const MAX_REQUEST_HEAD: usize = 4096;
const PEEK_ATTEMPTS: usize = 20;

type WsReceiver = SplitStream<WebSocketStream<TcpStream>>;

/// Extracts the requested slot name from a request path such as
/// `/ws/player1`. Returns `None` for paths outside the WebSocket route.
pub fn slot_from_path(path: &str) -> Option<&str> {
    path.rfind(ROUTE_PREFIX).map(|start| &path[start + ROUTE_PREFIX.len()..])
}

/// True for a `GET` request line whose path ends in `/status` and is not a
/// WebSocket slot route.
pub fn is_status_request(request_line: &str) -> bool {
    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => {
            let path = target.split(['?', '#']).next().unwrap_or(target);
            path.ends_with(STATUS_SUFFIX) && slot_from_path(path).is_none()
        }
        _ => false,
    }
}

pub struct NetworkServer {
    listener: TcpListener,
    coordinator: Arc<GameCoordinator>,
}

impl NetworkServer {
    pub async fn bind(
        addr: &str,
        coordinator: Arc<GameCoordinator>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "Server listening on ws://{}{}{{player_id}}",
            listener.local_addr()?,
            ROUTE_PREFIX
        );

        Ok(Self {
            listener,
            coordinator,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, one task per connection.
    pub async fn run(&self) -> Result<(), ServerError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("Accepted TCP connection from {}", addr);
                    let coordinator = Arc::clone(&self.coordinator);
                    tokio::spawn(async move {
                        handle_connection(stream, addr, coordinator).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

/// Looks at the first request line without consuming it, so the WebSocket
/// handshake still sees the whole request.
async fn peek_request_line(stream: &TcpStream) -> Option<String> {
    let mut buf = [0u8; MAX_REQUEST_HEAD];
    for _ in 0..PEEK_ATTEMPTS {
        let n = stream.peek(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        if let Some(end) = buf[..n].windows(2).position(|w| w == b"\r\n") {
            return Some(String::from_utf8_lossy(&buf[..end]).into_owned());
        }
        if n == buf.len() {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    None
}

async fn serve_status(
    mut stream: TcpStream,
    coordinator: &GameCoordinator,
) -> Result<(), ServerError> {
    let mut head = Vec::new();
    let mut chunk = [0u8; 512];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < MAX_REQUEST_HEAD {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::to_string(&coordinator.status().await)?;
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    coordinator: Arc<GameCoordinator>,
) {
    if let Some(line) = peek_request_line(&stream).await {
        if is_status_request(&line) {
            debug!("Status request from {}", addr);
            if let Err(e) = serve_status(stream, &coordinator).await {
                warn!("Failed to answer status request from {}: {}", addr, e);
            }
            return;
        }
    }

    let mut requested = String::new();
    let route = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        match slot_from_path(request.uri().path()) {
            Some(slot) => {
                requested = slot.to_string();
                Ok(response)
            }
            None => {
                let mut not_found = ErrorResponse::new(Some("Not Found".to_string()));
                *not_found.status_mut() = StatusCode::NOT_FOUND;
                Err(not_found)
            }
        }
    };

    let ws_stream = match accept_hdr_async(stream, route).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake failed for {}: {}", addr, e);
            return;
        }
    };

    let (mut ws_sender, ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);
    let id = coordinator.next_connection_id();

    let slot = match coordinator.bind(&requested, id, addr, tx).await {
        Ok(slot) => slot,
        Err(e) => {
            warn!("Rejected {} asking for {:?}: {}", addr, requested, e);
            let frame = CloseFrame {
                code: CloseCode::Policy,
                reason: e.to_string().into(),
            };
            if let Err(e) = ws_sender.send(Message::Close(Some(frame))).await {
                debug!("Failed to send close frame to {}: {}", addr, e);
            }
            return;
        }
    };

    info!("{} connected from {} (connection {})", slot, addr, id);

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                debug!("Writer for {} stopped: {}", addr, e);
                break;
            }
        }
    });

    read_frames(&coordinator, slot, ws_receiver).await;

    coordinator.disconnect(slot, id).await;
    writer.abort();
    debug!("Connection {} from {} closed", id, addr);
}

async fn read_frames(
    coordinator: &Arc<GameCoordinator>,
    slot: Slot,
    mut ws_receiver: WsReceiver,
) {
    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_client_message(coordinator, slot, &text).await,
            Ok(Message::Close(_)) => {
                debug!("{} sent close", slot);
                break;
            }
            Ok(Message::Binary(_)) => warn!("Ignoring binary frame from {}", slot),
            // Ping replies are queued by tungstenite itself.
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error for {}: {}", slot, e);
                break;
            }
        }
    }
}

async fn handle_client_message(coordinator: &Arc<GameCoordinator>, slot: Slot, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Input {
            action: Some(action),
        }) => coordinator.apply_input(slot.as_str(), &action).await,
        Ok(ClientMessage::Input { action: None }) => {
            debug!("Input from {} without an action", slot)
        }
        Ok(ClientMessage::Reset) => {
            info!("Reset requested by {}", slot);
            coordinator.reset().await;
        }
        Ok(ClientMessage::Unknown) => debug!("Ignoring unknown message type from {}", slot),
        Err(e) => warn!("Malformed message from {}: {}", slot, e),
    }
}
