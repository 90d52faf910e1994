//! The gossip state machine.
//!
//! [`Network`] owns the peer set and wires every connection, inbound or
//! dialed, to the same pair of pumps: the inbound pump decodes frames and
//! dispatches them to [`Network::handle`], the outbound pump drains the
//! peer's outbox onto the socket. Either pump ending tears the peer down.
//!
//! Rebroadcast discipline: a mutation is broadcast exactly once, by the node
//! that first accepted it from a local user. Everything arriving here via
//! gossip is applied but never re-emitted.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use pyrite_core::block::Block;
use pyrite_core::chain::Chain;
use pyrite_core::mempool::Mempool;
use pyrite_core::transaction::Tx;

use crate::peer::{Peer, PeerError, PeerSet, PeerSink, PeerStream};
use crate::protocol::{Envelope, MessageKind, PeerAddr};

/// How often the newest block is re-announced to every peer.
pub const TICKLE_INTERVAL: Duration = Duration::from_secs(30);

/// Gossip coordinator: peer set plus the chain and mempool it mutates.
pub struct Network {
    chain: Arc<Chain>,
    mempool: Arc<Mempool>,
    peers: PeerSet,
    listen_port: u16,
}

impl Network {
    pub fn new(chain: Arc<Chain>, mempool: Arc<Mempool>, listen_port: u16) -> Arc<Self> {
        Arc::new(Self {
            chain,
            mempool,
            peers: PeerSet::new(),
            listen_port,
        })
    }

    /// Keys of every connected peer.
    pub fn peer_keys(&self) -> Vec<String> {
        self.peers.keys()
    }

    /// Register a connection and start its pumps. `key` is the peer's
    /// announced `address:port`, never the ephemeral socket port.
    pub fn attach(self: Arc<Self>, key: String, sink: PeerSink, stream: PeerStream) -> Peer {
        let (peer, inbox) = Peer::new(key);
        self.peers.insert(peer.clone());
        let pump_peer = peer.clone();
        tokio::spawn(self.run_peer(pump_peer, sink, stream, inbox));
        peer
    }

    /// Dial `ws://address:port/ws` announcing our own listen port, register
    /// the peer, and open the sync dance by sending our newest block.
    ///
    /// `broadcast` distinguishes a human-initiated add (fan the new peer out
    /// to everyone else so they can dial back) from the resulting
    /// peer-initiated adds (which must not fan out again).
    pub async fn add_peer(
        self: Arc<Self>,
        address: &str,
        port: u16,
        broadcast: bool,
    ) -> Result<(), PeerError> {
        let url = format!("ws://{address}:{port}/ws?openPort={}", self.listen_port);
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| PeerError::Dial(e.to_string()))?;

        let (sink, stream) = socket.split();
        let sink: PeerSink = Box::pin(
            sink.sink_map_err(|e| PeerError::Io(e.to_string()))
                .with(|text: String| {
                    std::future::ready(Ok::<_, PeerError>(Message::Text(text.into())))
                }),
        );
        let stream: PeerStream = Box::pin(stream.filter_map(|frame| {
            std::future::ready(match frame {
                Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                Ok(Message::Close(_)) => Some(Err(PeerError::Closed)),
                Ok(_) => None,
                Err(e) => Some(Err(PeerError::Io(e.to_string()))),
            })
        }));

        let peer = self
            .clone()
            .attach(format!("{address}:{port}"), sink, stream);
        info!(peer = %peer.key, "connected to peer");

        if broadcast {
            let addr = PeerAddr { address: address.to_string(), port };
            self.broadcast_new_peer(&addr, &peer.key);
        }
        self.send_newest_block(&peer);
        Ok(())
    }

    /// Announce a locally mined block to every peer.
    pub fn broadcast_new_block(&self, block: &Block) {
        match Envelope::notify_new_block(block) {
            Ok(envelope) => self.broadcast(&envelope),
            Err(e) => warn!(error = %e, "failed to encode block announcement"),
        }
    }

    /// Announce a locally accepted transaction to every peer.
    pub fn broadcast_new_tx(&self, tx: &Tx) {
        match Envelope::notify_new_tx(tx) {
            Ok(envelope) => self.broadcast(&envelope),
            Err(e) => warn!(error = %e, "failed to encode transaction announcement"),
        }
    }

    /// Periodically re-announce the newest block so long-lived peers that
    /// missed a broadcast still converge.
    pub fn start_tickle(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let network = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // the first tick is immediate
            loop {
                ticker.tick().await;
                if network.peers.is_empty() {
                    continue;
                }
                match network.chain.newest_block() {
                    Ok(block) => match Envelope::newest_block(&block) {
                        Ok(envelope) => network.broadcast(&envelope),
                        Err(e) => warn!(error = %e, "failed to encode tickle"),
                    },
                    Err(e) => warn!(error = %e, "tickle skipped: no newest block"),
                }
            }
        })
    }

    /// Enqueue an envelope for every peer. Iterates a snapshot so the set
    /// lock is not held while enqueueing.
    fn broadcast(&self, envelope: &Envelope) {
        for peer in self.peers.snapshot() {
            peer.send(envelope.clone());
        }
    }

    fn broadcast_new_peer(&self, addr: &PeerAddr, except_key: &str) {
        let envelope = match Envelope::notify_new_peer(addr) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "failed to encode peer announcement");
                return;
            }
        };
        for peer in self.peers.snapshot() {
            if peer.key != except_key {
                peer.send(envelope.clone());
            }
        }
    }

    fn send_newest_block(&self, peer: &Peer) {
        match self.chain.newest_block() {
            Ok(block) => match Envelope::newest_block(&block) {
                Ok(envelope) => peer.send(envelope),
                Err(e) => warn!(error = %e, "failed to encode newest block"),
            },
            Err(e) => warn!(error = %e, "cannot announce newest block"),
        }
    }

    /// Run both pumps until either side ends, then drop the peer.
    async fn run_peer(
        self: Arc<Self>,
        peer: Peer,
        mut sink: PeerSink,
        mut stream: PeerStream,
        mut inbox: mpsc::Receiver<Envelope>,
    ) {
        let inbound = async {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(text) => match Envelope::decode(&text) {
                        Ok(envelope) => Self::handle(&self, &peer, envelope),
                        Err(e) => {
                            debug!(peer = %peer.key, error = %e, "dropping malformed gossip frame");
                        }
                    },
                    Err(e) => {
                        debug!(peer = %peer.key, error = %e, "peer read failed");
                        break;
                    }
                }
            }
        };
        let outbound = async {
            while let Some(envelope) = inbox.recv().await {
                let text = match envelope.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(peer = %peer.key, error = %e, "failed to encode outbound message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(text).await {
                    debug!(peer = %peer.key, error = %e, "peer write failed");
                    break;
                }
            }
        };

        tokio::select! {
            _ = inbound => {}
            _ = outbound => {}
        }

        self.peers.remove(&peer.key, peer.id());
        info!(peer = %peer.key, "peer disconnected");
    }

    /// Apply one gossip message. Mutations applied here are never re-emitted.
    ///
    /// Associated function rather than a method: `NotifyNewPeer` needs to
    /// clone the `Arc` into a dial task.
    fn handle(network: &Arc<Self>, peer: &Peer, envelope: Envelope) {
        match envelope.kind {
            MessageKind::NewestBlock => {
                let Ok(block) = envelope.parse_payload::<Block>() else {
                    return network.drop_malformed(peer, envelope.kind);
                };
                let ours = match network.chain.newest_block() {
                    Ok(ours) => ours,
                    Err(e) => {
                        warn!(error = %e, "cannot compare newest blocks");
                        return;
                    }
                };
                if block.height >= ours.height {
                    peer.send(Envelope::all_blocks_request());
                } else if let Ok(reply) = Envelope::newest_block(&ours) {
                    peer.send(reply);
                }
            }
            MessageKind::AllBlocksRequest => match network.chain.blocks() {
                Ok(blocks) => {
                    if let Ok(reply) = Envelope::all_blocks_response(&blocks) {
                        peer.send(reply);
                    }
                }
                Err(e) => warn!(error = %e, "cannot serve chain to peer"),
            },
            MessageKind::AllBlocksResponse => {
                let Ok(blocks) = envelope.parse_payload::<Vec<Block>>() else {
                    return network.drop_malformed(peer, envelope.kind);
                };
                if let Err(e) = network.chain.replace(&blocks) {
                    warn!(peer = %peer.key, error = %e, "chain replace failed");
                }
            }
            MessageKind::NotifyNewBlock => {
                let Ok(block) = envelope.parse_payload::<Block>() else {
                    return network.drop_malformed(peer, envelope.kind);
                };
                if let Err(e) = network.chain.add_block_from_peer(&network.mempool, &block) {
                    warn!(peer = %peer.key, error = %e, "failed to accept peer block");
                }
            }
            MessageKind::NotifyNewPeer => {
                let Ok(addr) = envelope.parse_payload::<PeerAddr>() else {
                    return network.drop_malformed(peer, envelope.kind);
                };
                let network = Arc::clone(network);
                tokio::spawn(async move {
                    if let Err(e) = network.add_peer(&addr.address, addr.port, false).await {
                        warn!(address = %addr.address, port = addr.port, error = %e,
                            "failed to dial announced peer");
                    }
                });
            }
            MessageKind::NotifyNewTx => {
                let Ok(tx) = envelope.parse_payload::<Tx>() else {
                    return network.drop_malformed(peer, envelope.kind);
                };
                if let Err(e) = network.mempool.add_tx_from_peer(&network.chain, tx) {
                    debug!(peer = %peer.key, error = %e, "rejected peer transaction");
                }
            }
        }
    }

    fn drop_malformed(&self, peer: &Peer, kind: MessageKind) {
        debug!(peer = %peer.key, kind = ?kind, "dropping malformed gossip payload");
    }
}
