//! Peer-to-peer wire protocol (§6). JSON-over-HTTP request/response bodies, generalized from the
//! teacher's libp2p `RPCRequest`/`RPCResponse` enums in `node/forest_libp2p/src/service.rs` — one
//! request type per method, dispatched over plain HTTP POST instead of a libp2p protocol id.

use serde::{Deserialize, Serialize};

use crate::transaction::wire::TransactionJson;

/// `getInfo` request/response: peers exchange identity on first contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub application: String,
    pub version: String,
    pub platform: Option<String>,
    #[serde(rename = "shareAddress")]
    pub share_address: bool,
    #[serde(rename = "announcedAddress", skip_serializing_if = "Option::is_none")]
    pub announced_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hallmark: Option<String>,
}

/// `getPeers` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeersResponse {
    pub peers: Vec<String>,
}

/// `processTransactions` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessTransactionsRequest {
    pub transactions: Vec<TransactionJson>,
}

/// Acknowledgement returned by `processTransactions` and `processBlock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub accepted: bool,
}

/// `processBlock` request. The block body beyond the transaction list (header, generator
/// signature, prior-block pointer) belongs to the forging/ledger subsystem, out of scope here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessBlockRequest {
    pub height: i64,
    pub timestamp: u32,
    pub transactions: Vec<TransactionJson>,
}

/// `getUnconfirmedTransactions` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnconfirmedTransactionsResponse {
    #[serde(rename = "unconfirmedTransactions")]
    pub unconfirmed_transactions: Vec<TransactionJson>,
}
