//! # pyrite-network
//! Peer set, per-peer message pumps, and the gossip protocol that keeps
//! Pyrite nodes converged over WebSocket connections.

pub mod gossip;
pub mod peer;
pub mod protocol;

pub use gossip::Network;
pub use peer::{Peer, PeerError, PeerSet, PeerSink, PeerStream};
pub use protocol::{Envelope, MessageKind, PeerAddr};
