//! Gossip wire messages.
//!
//! Every frame on the wire is one JSON envelope `{type, payload}`; the
//! payload is an opaque JSON value interpreted per message type. WebSocket
//! text frames provide the length delimiting.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pyrite_core::block::Block;
use pyrite_core::transaction::Tx;

/// The six gossip message types.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Head-block exchange opening the sync dance.
    NewestBlock,
    /// The sender is behind and wants the full chain.
    AllBlocksRequest,
    /// Full chain, head to genesis.
    AllBlocksResponse,
    /// A freshly mined block, broadcast once by its miner.
    NotifyNewBlock,
    /// A peer added through the API, fanned out so others can dial back.
    NotifyNewPeer,
    /// A freshly accepted transaction, broadcast once by its origin node.
    NotifyNewTx,
}

/// One gossip frame.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub payload: Value,
}

/// Announced listen endpoint of a peer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PeerAddr {
    pub address: String,
    pub port: u16,
}

impl Envelope {
    fn with_payload<T: Serialize>(
        kind: MessageKind,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self { kind, payload: serde_json::to_value(payload)? })
    }

    pub fn newest_block(block: &Block) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageKind::NewestBlock, block)
    }

    pub fn all_blocks_request() -> Self {
        Self { kind: MessageKind::AllBlocksRequest, payload: Value::Null }
    }

    pub fn all_blocks_response(blocks: &[Block]) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageKind::AllBlocksResponse, &blocks)
    }

    pub fn notify_new_block(block: &Block) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageKind::NotifyNewBlock, block)
    }

    pub fn notify_new_peer(addr: &PeerAddr) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageKind::NotifyNewPeer, addr)
    }

    pub fn notify_new_tx(tx: &Tx) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageKind::NotifyNewTx, tx)
    }

    /// Interpret the payload as the type the message kind implies.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
