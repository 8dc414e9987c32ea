use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::de::DeserializeOwned;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::BusError;
use crate::message::BusMessage;

/// Default per-subscriber buffer size.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// What a listener tells the bus after seeing a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    /// Not ours; the listener's reply handle is released immediately.
    NotHandled,
    /// The listener keeps the reply handle and will answer later.
    WillReplyAsync,
}

/// A message as delivered to one subscriber, with the shared reply handle.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub message: BusMessage,
    pub reply: ReplyChannel,
}

/// Single-shot reply handle shared by every copy of one sent message.
///
/// The sender's [`PendingReply`] resolves with the first response, or with
/// [`BusError::PortClosed`] once every copy has been dropped unanswered.
#[derive(Debug, Clone)]
pub struct ReplyChannel {
    slot: Arc<Mutex<Option<oneshot::Sender<serde_json::Value>>>>,
}

impl ReplyChannel {
    fn new(tx: oneshot::Sender<serde_json::Value>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Send the reply. Only the first call on any copy can succeed.
    pub fn send_response(&self, value: serde_json::Value) -> Result<(), BusError> {
        let tx = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or(BusError::AlreadyResponded)?;
        tx.send(value).map_err(|_| BusError::PortClosed)
    }

    /// Serialize and send a typed reply.
    pub fn respond<T: serde::Serialize>(&self, value: &T) -> Result<(), BusError> {
        let value =
            serde_json::to_value(value).map_err(|e| BusError::MalformedReply(e.to_string()))?;
        self.send_response(value)
    }
}

/// Reply future returned to the sender of a message.
#[derive(Debug)]
pub struct PendingReply {
    inner: Result<oneshot::Receiver<serde_json::Value>, BusError>,
}

impl PendingReply {
    fn failed(error: BusError) -> Self {
        Self { inner: Err(error) }
    }

    /// The delivery error, if the message never reached a listener.
    pub fn error(&self) -> Option<&BusError> {
        self.inner.as_ref().err()
    }

    /// Wait for the first reply from any listener.
    pub async fn recv(self) -> Result<serde_json::Value, BusError> {
        match self.inner {
            Ok(rx) => rx.await.map_err(|_| BusError::PortClosed),
            Err(e) => Err(e),
        }
    }

    /// Wait for the reply and decode it.
    pub async fn recv_as<T: DeserializeOwned>(self) -> Result<T, BusError> {
        let value = self.recv().await?;
        serde_json::from_value(value).map_err(|e| BusError::MalformedReply(e.to_string()))
    }
}

struct BusInner {
    subscribers: Mutex<Vec<(u64, mpsc::Sender<Envelope>)>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl BusInner {
    fn broadcast(&self, message: BusMessage, sender: Option<u64>) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        let reply = ReplyChannel::new(tx);

        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|(_, tx)| !tx.is_closed());

        let mut delivered = 0usize;
        for (id, sub_tx) in subscribers.iter() {
            if Some(*id) == sender {
                continue;
            }
            let envelope = Envelope {
                message: message.clone(),
                reply: reply.clone(),
            };
            match sub_tx.try_send(envelope) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber = id, tag = message.tag(), "Subscriber buffer full; message dropped");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
        drop(subscribers);
        drop(reply);

        debug!(tag = message.tag(), ?sender, delivered, "Message broadcast");
        if delivered == 0 {
            return PendingReply::failed(BusError::NoReceivers);
        }
        PendingReply { inner: Ok(rx) }
    }

    fn remove(&self, id: u64) {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|(sub_id, _)| *sub_id != id);
    }
}

/// The cross-context message bus shared by the popup and the background
/// worker.
///
/// Every sent message is delivered to every live subscriber, in send order
/// per sender. Delivery is best-effort: a subscriber whose buffer is full
/// misses the message.
#[derive(Clone)]
pub struct MiruBus {
    inner: Arc<BusInner>,
}

impl MiruBus {
    /// Create a new bus with default buffer sizes.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with a custom per-subscriber buffer size.
    pub fn with_buffer_size(buffer: usize) -> Self {
        info!(buffer_size = buffer, "MiruBus initialized");
        Self {
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register a listener. It stays registered until the returned
    /// subscription is dropped or unsubscribed.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, tx));
        debug!(subscriber = id, "Bus subscriber registered");
        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Broadcast a message to every listener without waiting for anyone to
    /// handle it.
    pub fn send_message(&self, message: BusMessage) -> PendingReply {
        self.inner.broadcast(message, None)
    }

    /// Broadcast on behalf of the listener `sender`, which does not receive
    /// its own message.
    pub fn send_message_from(&self, sender: u64, message: BusMessage) -> PendingReply {
        self.inner.broadcast(message, Some(sender))
    }

    /// Number of currently registered listeners.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|(_, tx)| !tx.is_closed());
        subscribers.len()
    }

    /// Drop every listener. Subscriptions drain what they already hold and
    /// then report the bus as closed.
    pub fn close(&self) {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        info!("MiruBus closed");
    }
}

impl Default for MiruBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered bus listener. Dropping it deregisters the listener.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Envelope>,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next message. `None` once the bus is closed.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Take the next buffered message, if any.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Broadcast to every other listener on the bus.
    pub fn send_message(&self, message: BusMessage) -> PendingReply {
        match self.bus.upgrade() {
            Some(bus) => bus.broadcast(message, Some(self.id)),
            None => PendingReply::failed(BusError::NoReceivers),
        }
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
            debug!(subscriber = self.id, "Bus subscriber removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CaptureOutcome;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bus_send_receive() {
        let bus = MiruBus::new();
        let mut sub = bus.subscribe();

        let _reply = bus.send_message(BusMessage::capture_request(Some(1)));
        let envelope = sub.recv().await.unwrap();
        assert_eq!(envelope.message.request_id(), Some(1));
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_message() {
        let bus = MiruBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let _ = bus.send_message(BusMessage::Unknown);
        assert!(a.try_recv().is_some());
        assert!(b.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_no_receivers() {
        let bus = MiruBus::new();
        let reply = bus.send_message(BusMessage::capture_request(None));
        assert_eq!(reply.recv().await, Err(BusError::NoReceivers));
    }

    #[tokio::test]
    async fn test_unsubscribe_deregisters() {
        let bus = MiruBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_reply_reaches_sender_once() {
        let bus = MiruBus::new();
        let mut sub = bus.subscribe();

        let pending = bus.send_message(BusMessage::capture_request(None));
        let envelope = sub.recv().await.unwrap();
        envelope
            .reply
            .send_response(serde_json::json!({"ok": true}))
            .unwrap();
        assert_eq!(
            envelope.reply.send_response(serde_json::json!({"ok": false})),
            Err(BusError::AlreadyResponded)
        );

        let value = tokio::time::timeout(Duration::from_secs(1), pending.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_port_closes_when_nobody_replies() {
        let bus = MiruBus::new();
        let mut sub = bus.subscribe();

        let pending = bus.send_message(BusMessage::ScreenshotTaken(CaptureOutcome::default()));
        let envelope = sub.recv().await.unwrap();
        drop(envelope);

        let result = tokio::time::timeout(Duration::from_secs(1), pending.recv())
            .await
            .unwrap();
        assert_eq!(result, Err(BusError::PortClosed));
    }

    #[tokio::test]
    async fn test_full_subscriber_drops_message() {
        let bus = MiruBus::with_buffer_size(1);
        let mut sub = bus.subscribe();

        let _ = bus.send_message(BusMessage::capture_request(Some(1)));
        let _ = bus.send_message(BusMessage::capture_request(Some(2)));

        assert_eq!(sub.try_recv().unwrap().message.request_id(), Some(1));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_sender_does_not_receive_own_message() {
        let bus = MiruBus::new();
        let mut sender = bus.subscribe();
        let mut other = bus.subscribe();

        let pending = sender.send_message(BusMessage::capture_request(Some(1)));
        assert!(pending.error().is_none());
        assert!(sender.try_recv().is_none());
        assert_eq!(other.try_recv().unwrap().message.request_id(), Some(1));

        let _ = bus.send_message_from(other.id(), BusMessage::Unknown);
        assert!(other.try_recv().is_none());
        assert_eq!(sender.try_recv().unwrap().message, BusMessage::Unknown);
    }

    #[tokio::test]
    async fn test_lone_sender_gets_no_receivers() {
        let bus = MiruBus::new();
        let sender = bus.subscribe();

        let pending = sender.send_message(BusMessage::capture_request(None));
        assert_eq!(pending.error(), Some(&BusError::NoReceivers));
        assert_eq!(pending.recv().await, Err(BusError::NoReceivers));
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let bus = MiruBus::new();
        let mut sub = bus.subscribe();
        bus.close();
        assert!(sub.recv().await.is_none());
    }
}
