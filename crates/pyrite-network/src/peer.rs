//! Connected peers and the set that owns them.
//!
//! A [`Peer`] is a handle: the key it was registered under plus the sender
//! side of its bounded outbox. The pump task owning the socket drains the
//! outbox; enqueueing therefore never blocks on the wire, and broadcast can
//! iterate a snapshot of handles without holding the set lock during writes.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{Sink, Stream};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::protocol::Envelope;

/// Messages a slow peer may have queued before new ones are dropped.
pub const OUTBOX_CAPACITY: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    #[error("peer io: {0}")] Io(String),
    #[error("peer connection closed")] Closed,
    #[error("dial failed: {0}")] Dial(String),
}

/// Transport-erased write half: one JSON envelope string per call.
pub type PeerSink = Pin<Box<dyn Sink<String, Error = PeerError> + Send>>;

/// Transport-erased read half: one JSON envelope string per item.
pub type PeerStream = Pin<Box<dyn Stream<Item = Result<String, PeerError>> + Send>>;

static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a connected peer.
#[derive(Clone)]
pub struct Peer {
    /// `address:port` of the peer's announced listen endpoint.
    pub key: String,
    id: u64,
    outbox: mpsc::Sender<Envelope>,
}

impl Peer {
    pub(crate) fn new(key: String) -> (Self, mpsc::Receiver<Envelope>) {
        let (outbox, inbox) = mpsc::channel(OUTBOX_CAPACITY);
        let id = NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed);
        (Self { key, id, outbox }, inbox)
    }

    /// Instance id distinguishing this registration from a later one that
    /// overwrote the same key.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Enqueue a message for this peer's writer.
    ///
    /// A full outbox drops the message (the peer is too slow to care about
    /// it); a closed outbox means the pump already exited and the message has
    /// nowhere to go.
    pub fn send(&self, envelope: Envelope) {
        use mpsc::error::TrySendError;
        match self.outbox.try_send(envelope) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(peer = %self.key, "peer outbox full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// The set of live peers, keyed by `address:port`.
pub struct PeerSet {
    inner: Mutex<HashMap<String, Peer>>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    /// Register a peer. A duplicate key overwrites the previous handle.
    pub fn insert(&self, peer: Peer) {
        self.inner.lock().insert(peer.key.clone(), peer);
    }

    /// Remove a peer, but only the registration that `id` belongs to; a pump
    /// tearing down late must not evict a newer connection that reused its
    /// key. Idempotent.
    pub fn remove(&self, key: &str, id: u64) {
        let mut peers = self.inner.lock();
        if peers.get(key).is_some_and(|p| p.id == id) {
            peers.remove(key);
        }
    }

    pub fn get(&self, key: &str) -> Option<Peer> {
        self.inner.lock().get(key).cloned()
    }

    /// Keys of every live peer.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Clone of every live peer handle, for broadcast iteration.
    pub fn snapshot(&self) -> Vec<Peer> {
        self.inner.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for PeerSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let set = PeerSet::new();
        let (peer, _inbox) = Peer::new("1.2.3.4:5000".into());
        set.insert(peer);
        assert_eq!(set.len(), 1);
        assert!(set.get("1.2.3.4:5000").is_some());
        assert_eq!(set.keys(), vec!["1.2.3.4:5000".to_string()]);
    }

    #[test]
    fn duplicate_key_overwrites() {
        let set = PeerSet::new();
        let (first, _a) = Peer::new("k".into());
        let (second, _b) = Peer::new("k".into());
        let second_id = second.id();
        set.insert(first);
        set.insert(second);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("k").unwrap().id(), second_id);
    }

    #[test]
    fn remove_is_instance_scoped() {
        let set = PeerSet::new();
        let (old, _a) = Peer::new("k".into());
        let (new, _b) = Peer::new("k".into());
        let old_id = old.id();
        let new_id = new.id();
        set.insert(old);
        set.insert(new);

        // the stale pump's teardown must not evict the replacement
        set.remove("k", old_id);
        assert_eq!(set.len(), 1);

        set.remove("k", new_id);
        assert!(set.is_empty());
        // removing again is a no-op
        set.remove("k", new_id);
    }

    #[test]
    fn send_queues_until_capacity_then_drops() {
        let (peer, mut inbox) = Peer::new("k".into());
        for _ in 0..OUTBOX_CAPACITY + 5 {
            peer.send(Envelope::all_blocks_request());
        }
        let mut delivered = 0;
        while inbox.try_recv().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, OUTBOX_CAPACITY);
    }

    #[test]
    fn send_after_inbox_dropped_is_silent() {
        let (peer, inbox) = Peer::new("k".into());
        drop(inbox);
        peer.send(Envelope::all_blocks_request());
    }
}
