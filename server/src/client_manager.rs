//! Slot-to-connection registry
//!
//! Each of the two player slots holds at most one live connection. A
//! connection is represented only by its bounded outbound queue: the
//! transport task on the other end drains the queue into the socket. A closed
//! queue means the peer is gone; a full one means it stopped reading.

use crate::error::BindError;
use log::info;
use pong_shared::Slot;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;

/// Identifies one accepted connection for the life of the process.
pub type ConnectionId = u32;

/// Outbound half of a bound connection.
pub type Outbound = mpsc::Sender<Message>;

/// Frames a connection may have queued before it counts as stalled.
/// About two seconds of state updates at the default tick rate.
pub const OUTBOUND_CAPACITY: usize = 128;

/// A connection bound to a player slot
#[derive(Debug)]
pub struct Client {
    pub id: ConnectionId,
    pub slot: Slot,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    sender: Outbound,
}

impl Client {
    pub fn new(id: ConnectionId, slot: Slot, addr: SocketAddr, sender: Outbound) -> Self {
        Self {
            id,
            slot,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues a frame without waiting. Fails if the peer's task has gone
    /// away or its queue is full.
    pub fn send(&self, message: Message) -> Result<(), TrySendError<Message>> {
        self.sender.try_send(message)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Owns the at-most-one-connection-per-slot binding.
#[derive(Debug, Default)]
pub struct ClientManager {
    clients: HashMap<Slot, Client>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Binds `client` to its slot, refusing if the slot is already held.
    pub fn add_client(&mut self, client: Client) -> Result<(), BindError> {
        if self.clients.contains_key(&client.slot) {
            return Err(BindError::SlotTaken(client.slot));
        }

        info!(
            "Connection {} from {} bound to {}",
            client.id, client.addr, client.slot
        );
        self.clients.insert(client.slot, client);
        Ok(())
    }

    /// Frees `slot` whoever holds it. Idempotent.
    pub fn remove_client(&mut self, slot: Slot) -> Option<Client> {
        let removed = self.clients.remove(&slot);
        if let Some(client) = &removed {
            info!(
                "Connection {} released {} after {:.1}s",
                client.id,
                slot,
                client.connected_at.elapsed().as_secs_f32()
            );
        }
        removed
    }

    /// Frees `slot` only if it is still held by connection `id`.
    pub fn remove_connection(&mut self, slot: Slot, id: ConnectionId) -> Option<Client> {
        match self.clients.get(&slot) {
            Some(client) if client.id == id => self.remove_client(slot),
            _ => None,
        }
    }

    pub fn get(&self, slot: Slot) -> Option<&Client> {
        self.clients.get(&slot)
    }

    pub fn is_bound(&self, slot: Slot) -> bool {
        self.clients.contains_key(&slot)
    }

    /// Queues `message` for one slot. Returns false if the slot is free or
    /// its peer is gone.
    pub fn send_to(&self, slot: Slot, message: Message) -> bool {
        match self.clients.get(&slot) {
            Some(client) => client.send(message).is_ok(),
            None => false,
        }
    }

    /// Queues `message` for every bound connection and returns the slots
    /// whose peer is gone or stalled. A failed slot never stops delivery to
    /// the rest.
    pub fn broadcast(&self, message: &Message) -> Vec<Slot> {
        let mut failed = Vec::new();
        for slot in Slot::ALL {
            if let Some(client) = self.clients.get(&slot) {
                if client.send(message.clone()).is_err() {
                    failed.push(slot);
                }
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_client(id: ConnectionId, slot: Slot) -> (Client, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        (Client::new(id, slot, test_addr(), tx), rx)
    }

    #[test]
    fn test_client_creation() {
        let (client, _rx) = test_client(1, Slot::Player1);
        assert_eq!(client.id, 1);
        assert_eq!(client.slot, Slot::Player1);
        assert_eq!(client.addr, test_addr());
        assert!(!client.is_closed());
    }

    #[test]
    fn test_client_send_after_receiver_dropped() {
        let (client, rx) = test_client(1, Slot::Player1);
        assert!(client.send(Message::text("a")).is_ok());
        drop(rx);
        assert!(client.is_closed());
        assert!(client.send(Message::text("b")).is_err());
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new();
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_add_both_slots() {
        let mut manager = ClientManager::new();
        let (c1, _rx1) = test_client(1, Slot::Player1);
        let (c2, _rx2) = test_client(2, Slot::Player2);

        assert!(manager.add_client(c1).is_ok());
        assert!(manager.add_client(c2).is_ok());
        assert_eq!(manager.len(), 2);
        assert!(manager.is_bound(Slot::Player1));
        assert!(manager.is_bound(Slot::Player2));
    }

    #[test]
    fn test_add_taken_slot() {
        let mut manager = ClientManager::new();
        let (first, _rx1) = test_client(1, Slot::Player1);
        let (second, _rx2) = test_client(2, Slot::Player1);

        manager.add_client(first).unwrap();
        assert_eq!(
            manager.add_client(second),
            Err(BindError::SlotTaken(Slot::Player1))
        );
        assert_eq!(manager.get(Slot::Player1).map(|c| c.id), Some(1));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_client_is_idempotent() {
        let mut manager = ClientManager::new();
        let (c1, _rx) = test_client(1, Slot::Player1);
        manager.add_client(c1).unwrap();

        assert!(manager.remove_client(Slot::Player1).is_some());
        assert!(manager.remove_client(Slot::Player1).is_none());
        assert!(manager.remove_client(Slot::Player2).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_remove_connection_checks_owner() {
        let mut manager = ClientManager::new();
        let (c1, _rx) = test_client(7, Slot::Player2);
        manager.add_client(c1).unwrap();

        assert!(manager.remove_connection(Slot::Player2, 3).is_none());
        assert!(manager.is_bound(Slot::Player2));

        assert!(manager.remove_connection(Slot::Player2, 7).is_some());
        assert!(!manager.is_bound(Slot::Player2));
    }

    #[test]
    fn test_send_to() {
        let mut manager = ClientManager::new();
        let (c1, mut rx) = test_client(1, Slot::Player1);
        manager.add_client(c1).unwrap();

        assert!(manager.send_to(Slot::Player1, Message::text("hello")));
        assert!(!manager.send_to(Slot::Player2, Message::text("nobody")));
        assert_eq!(rx.try_recv().unwrap(), Message::text("hello"));
    }

    #[test]
    fn test_broadcast_continues_past_dead_peer() {
        let mut manager = ClientManager::new();
        let (c1, rx1) = test_client(1, Slot::Player1);
        let (c2, mut rx2) = test_client(2, Slot::Player2);
        manager.add_client(c1).unwrap();
        manager.add_client(c2).unwrap();

        drop(rx1);
        let failed = manager.broadcast(&Message::text("tick"));

        assert_eq!(failed, vec![Slot::Player1]);
        assert_eq!(rx2.try_recv().unwrap(), Message::text("tick"));
    }

    #[test]
    fn test_client_send_fails_when_queue_full() {
        let (client, mut rx) = test_client(1, Slot::Player1);
        for i in 0..OUTBOUND_CAPACITY {
            assert!(client.send(Message::text(i.to_string())).is_ok());
        }

        assert!(matches!(
            client.send(Message::text("overflow")),
            Err(TrySendError::Full(_))
        ));
        assert!(!client.is_closed());

        rx.try_recv().unwrap();
        assert!(client.send(Message::text("room again")).is_ok());
    }

    #[test]
    fn test_broadcast_reports_stalled_peer() {
        let mut manager = ClientManager::new();
        let (c1, _rx1) = test_client(1, Slot::Player1);
        let (c2, mut rx2) = test_client(2, Slot::Player2);
        manager.add_client(c1).unwrap();
        manager.add_client(c2).unwrap();

        for _ in 0..OUTBOUND_CAPACITY {
            assert!(manager.broadcast(&Message::text("tick")).is_empty());
            rx2.try_recv().unwrap();
        }

        assert_eq!(manager.broadcast(&Message::text("tick")), vec![Slot::Player1]);
        assert_eq!(rx2.try_recv().unwrap(), Message::text("tick"));
    }
}
