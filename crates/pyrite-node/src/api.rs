//! HTTP/JSON façade over the node.
//!
//! A thin axum router: every response is JSON, errors are
//! `{"errorMessage": ...}` envelopes, and `/ws` upgrades into the gossip
//! transport. Mutations accepted here are the ones that get broadcast;
//! everything arriving over gossip is applied without re-emission.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use pyrite_core::block::Block;
use pyrite_core::chain::ChainHead;
use pyrite_core::error::{ChainError, TxError};
use pyrite_core::traits::Signer;
use pyrite_core::transaction::{Tx, UTxOut};
use pyrite_network::{PeerError, PeerSink, PeerStream};

use crate::node::Node;

/// Build the router for a node.
pub fn router(node: Arc<Node>) -> Router {
    Router::new()
        .route("/", get(documentation))
        .route("/status", get(status))
        .route("/blocks", get(blocks).post(mine_block))
        .route("/blocks/{hash}", get(block_by_hash))
        .route("/balance/{address}", get(balance))
        .route("/mempool", get(mempool))
        .route("/transactions", post(post_transaction))
        .route("/wallet-address", get(wallet_address))
        .route("/peers", get(peers).post(post_peer))
        .route("/ws", get(ws_upgrade))
        .with_state(node)
}

// ── Error envelope ──────────────────────────────────────────────────────────

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "errorMessage": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::BlockNotFound => {
                Self { status: StatusCode::NOT_FOUND, message: e.to_string() }
            }
            ChainError::EmptyChain => Self::bad_request(e.to_string()),
            ChainError::Storage(_) | ChainError::Codec(_) => Self::internal(e.to_string()),
        }
    }
}

impl From<TxError> for ApiError {
    fn from(e: TxError) -> Self {
        match e {
            TxError::Chain(inner) => inner.into(),
            _ => Self::bad_request(e.to_string()),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct UrlDescription {
    url: &'static str,
    method: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'static str>,
}

async fn documentation() -> Json<Vec<UrlDescription>> {
    Json(vec![
        UrlDescription {
            url: "/",
            method: "GET",
            description: "Documentation of all endpoints",
            payload: None,
        },
        UrlDescription {
            url: "/status",
            method: "GET",
            description: "Chain head: last hash, height, current difficulty",
            payload: None,
        },
        UrlDescription {
            url: "/blocks",
            method: "GET",
            description: "All blocks, newest first",
            payload: None,
        },
        UrlDescription {
            url: "/blocks",
            method: "POST",
            description: "Mine a block from the mempool and broadcast it",
            payload: None,
        },
        UrlDescription {
            url: "/blocks/{hash}",
            method: "GET",
            description: "A single block by hash",
            payload: None,
        },
        UrlDescription {
            url: "/balance/{address}",
            method: "GET",
            description: "Unspent outputs for an address; ?total=true sums them",
            payload: None,
        },
        UrlDescription {
            url: "/mempool",
            method: "GET",
            description: "Unconfirmed transactions",
            payload: None,
        },
        UrlDescription {
            url: "/transactions",
            method: "POST",
            description: "Send coins from the node wallet and broadcast the transaction",
            payload: Some("{to: string, amount: int}"),
        },
        UrlDescription {
            url: "/wallet-address",
            method: "GET",
            description: "Address of the node wallet",
            payload: None,
        },
        UrlDescription {
            url: "/peers",
            method: "GET",
            description: "Connected peers",
            payload: None,
        },
        UrlDescription {
            url: "/peers",
            method: "POST",
            description: "Dial a peer and announce it to the others",
            payload: Some("{address: string, port: int}"),
        },
        UrlDescription {
            url: "/ws?openPort=P",
            method: "GET",
            description: "WebSocket upgrade for gossip",
            payload: None,
        },
    ])
}

async fn status(State(node): State<Arc<Node>>) -> Json<ChainHead> {
    Json(node.chain.status())
}

async fn blocks(State(node): State<Arc<Node>>) -> Result<Json<Vec<Block>>, ApiError> {
    Ok(Json(node.chain.blocks()?))
}

async fn mine_block(
    State(node): State<Arc<Node>>,
) -> Result<(StatusCode, Json<Block>), ApiError> {
    // the proof-of-work spinloop must not stall the async executor
    let miner = Arc::clone(&node);
    let block = tokio::task::spawn_blocking(move || {
        miner.chain.add_block(&miner.mempool, miner.wallet.as_ref())
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))??;

    node.network.broadcast_new_block(&block);
    Ok((StatusCode::CREATED, Json(block)))
}

async fn block_by_hash(
    State(node): State<Arc<Node>>,
    Path(hash): Path<String>,
) -> Result<Json<Block>, ApiError> {
    Ok(Json(node.chain.find_block(&hash)?))
}

#[derive(Deserialize)]
struct BalanceQuery {
    total: Option<bool>,
}

#[derive(Serialize)]
struct BalanceResponse {
    address: String,
    balance: u64,
}

async fn balance(
    State(node): State<Arc<Node>>,
    Path(address): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Result<Response, ApiError> {
    let pending = node.mempool.snapshot();
    if query.total.unwrap_or(false) {
        let balance = node.chain.balance_by_address(&address, &pending)?;
        Ok(Json(BalanceResponse { address, balance }).into_response())
    } else {
        let utxos: Vec<UTxOut> = node.chain.utxouts_by_address(&address, &pending)?;
        Ok(Json(utxos).into_response())
    }
}

async fn mempool(State(node): State<Arc<Node>>) -> Json<Vec<Tx>> {
    Json(node.mempool.snapshot())
}

#[derive(Deserialize)]
struct AddTxBody {
    to: String,
    amount: u64,
}

async fn post_transaction(
    State(node): State<Arc<Node>>,
    Json(body): Json<AddTxBody>,
) -> Result<(StatusCode, Json<Tx>), ApiError> {
    let tx = node
        .mempool
        .add_tx(&node.chain, node.wallet.as_ref(), &body.to, body.amount)?;
    node.network.broadcast_new_tx(&tx);
    Ok((StatusCode::CREATED, Json(tx)))
}

async fn wallet_address(State(node): State<Arc<Node>>) -> Json<serde_json::Value> {
    Json(json!({ "address": Signer::address(node.wallet.as_ref()) }))
}

async fn peers(State(node): State<Arc<Node>>) -> Json<Vec<String>> {
    Json(node.network.peer_keys())
}

#[derive(Deserialize)]
struct AddPeerBody {
    address: String,
    port: u16,
}

async fn post_peer(
    State(node): State<Arc<Node>>,
    Json(body): Json<AddPeerBody>,
) -> Result<StatusCode, ApiError> {
    Arc::clone(&node.network)
        .add_peer(&body.address, body.port, true)
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(StatusCode::CREATED)
}

// ── Gossip upgrade ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WsQuery {
    #[serde(rename = "openPort")]
    open_port: Option<String>,
}

/// Upgrade an incoming peer connection.
///
/// The peer is keyed by its socket origin IP plus the listen port it
/// announces in `openPort`; a missing announcement rejects the upgrade.
async fn ws_upgrade(
    State(node): State<Arc<Node>>,
    Query(query): Query<WsQuery>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(open_port) = query.open_port.filter(|p| !p.is_empty()) else {
        warn!(remote = %remote, "rejected websocket upgrade without openPort");
        return ApiError::bad_request("openPort query parameter is required").into_response();
    };

    let key = format!("{}:{}", remote.ip(), open_port);
    let network = Arc::clone(&node.network);
    ws.on_upgrade(move |socket| async move {
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
        network.attach(key, sink, stream);
    })
}
