use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;

pub type WsSender = mpsc::UnboundedSender<String>;

/// In-memory registry of live WebSocket connections, keyed by user id for
/// O(1) fan-out. A user may hold several entries at once (multiple devices
/// or tabs); each receives every push independently. Process-lifetime only:
/// a restart drops everything and clients reconnect.
#[derive(Clone)]
pub struct NotificationHub {
    connections: Arc<DashMap<i32, Vec<(u64, WsSender)>>>,
    next_conn_id: Arc<AtomicU64>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            next_conn_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a connection for `user_id`; returns the connection id and
    /// the channel the socket task pumps into the wire.
    pub fn subscribe(&self, user_id: i32) -> (u64, mpsc::UnboundedReceiver<String>) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .entry(user_id)
            .or_default()
            .push((conn_id, tx));
        (conn_id, rx)
    }

    /// Must run on every socket teardown path, including sockets that died
    /// before finishing their handshake.
    pub fn unsubscribe(&self, user_id: i32, conn_id: u64) {
        if let Some(mut senders) = self.connections.get_mut(&user_id) {
            senders.retain(|(id, _)| *id != conn_id);
            if senders.is_empty() {
                drop(senders);
                self.connections.remove(&user_id);
            }
        }
    }

    /// Push `message` to every live connection of `user_id`. A closed channel
    /// means the socket task is gone, so the entry is reaped on the spot.
    /// Zero connections is a silent miss; the store keeps the durable copy.
    pub fn send_to_user(&self, user_id: i32, message: &str) {
        if let Some(mut senders) = self.connections.get_mut(&user_id) {
            senders.retain(|(_, sender)| sender.send(message.to_string()).is_ok());
            if senders.is_empty() {
                drop(senders);
                self.connections.remove(&user_id);
            }
        }
    }

    pub fn connection_count(&self, user_id: i32) -> usize {
        self.connections
            .get(&user_id)
            .map(|senders| senders.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_then_receive() {
        let hub = NotificationHub::new();
        let (_conn, mut rx) = hub.subscribe(7);

        hub.send_to_user(7, "hello");
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn push_to_user_without_connections_is_silent() {
        let hub = NotificationHub::new();
        hub.send_to_user(99, "nobody home");
        assert_eq!(hub.connection_count(99), 0);
    }

    #[tokio::test]
    async fn multiple_connections_all_receive() {
        let hub = NotificationHub::new();
        let (_c1, mut rx1) = hub.subscribe(3);
        let (_c2, mut rx2) = hub.subscribe(3);
        assert_eq!(hub.connection_count(3), 2);

        hub.send_to_user(3, "fanout");
        assert_eq!(rx1.recv().await.unwrap(), "fanout");
        assert_eq!(rx2.recv().await.unwrap(), "fanout");
    }

    #[tokio::test]
    async fn push_does_not_cross_users() {
        let hub = NotificationHub::new();
        let (_c1, mut rx1) = hub.subscribe(1);
        let (_c2, mut rx2) = hub.subscribe(2);

        hub.send_to_user(1, "for user 1");
        assert_eq!(rx1.recv().await.unwrap(), "for user 1");
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_removes_connection() {
        let hub = NotificationHub::new();
        let (conn, _rx) = hub.subscribe(5);
        assert_eq!(hub.connection_count(5), 1);

        hub.unsubscribe(5, conn);
        assert_eq!(hub.connection_count(5), 0);
    }

    #[tokio::test]
    async fn dead_channel_is_reaped_on_send() {
        let hub = NotificationHub::new();
        let (_conn, rx) = hub.subscribe(4);
        drop(rx);

        hub.send_to_user(4, "into the void");
        assert_eq!(hub.connection_count(4), 0);
    }
}
