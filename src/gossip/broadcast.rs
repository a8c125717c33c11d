//! Broadcast fan-out (§4.4). Grounded on the teacher's bounded-parallelism message fan-out in
//! `node/forest_libp2p/src/service.rs` (gossipsub publish loop), generalized from a pub/sub mesh
//! to explicit HTTP POST requests sent to a bounded batch of peers at a time.

use std::sync::Arc;

use futures::future::join_all;
use reqwest::Client;
use tracing::debug;

use crate::config::NodeConfig;
use crate::peer::registry::PeerRegistry;
use crate::peer::{Peer, PeerState};

/// Outbound HTTP client plus the config knobs governing fan-out (§4.4): batch size, success
/// threshold, and per-peer send timeout.
pub struct GossipClient {
    http: Client,
    registry: Arc<PeerRegistry>,
    config: Arc<NodeConfig>,
}

impl GossipClient {
    pub fn new(registry: Arc<PeerRegistry>, config: Arc<NodeConfig>) -> Self {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .expect("reqwest client configuration is always valid");
        Self { http, registry, config }
    }

    /// Best-effort fan-out of `body` to at least `send_to_peers_limit` peers. Peers are walked in
    /// bounded-size batches (`broadcast_pool_size`); a batch is awaited before the next is
    /// submitted, and the loop stops as soon as the success count meets the target. Individual
    /// send failures are logged and swallowed — one flaky peer must never fail a broadcast.
    pub async fn send_to_some_peers<T>(&self, path: &str, body: &T)
    where
        T: serde::Serialize + Sync,
    {
        let eligible = self.eligible_peers();
        if eligible.is_empty() {
            debug!(path, "no eligible peers for broadcast");
            return;
        }

        let mut successes = 0usize;
        for batch in eligible.chunks(self.config.broadcast_pool_size) {
            if successes >= self.config.send_to_peers_limit {
                break;
            }
            let sends = batch.iter().map(|peer| self.send_one(peer, path, body));
            let results = join_all(sends).await;
            successes += results.into_iter().filter(|ok| *ok).count();
        }
    }

    fn eligible_peers(&self) -> Vec<Peer> {
        self.registry
            .get_all_peers()
            .into_iter()
            .filter(|p| p.state == PeerState::Connected)
            .filter(|p| !p.is_blacklisted(now_millis()))
            .filter(|p| {
                !self.config.enable_hallmark_protection || p.weight >= self.config.push_threshold
            })
            .collect()
    }

    async fn send_one<T>(&self, peer: &Peer, path: &str, body: &T) -> bool
    where
        T: serde::Serialize,
    {
        let url = format!("http://{}{}", peer.peer_address, path);
        match self.http.post(&url).json(body).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(peer = %peer.peer_address, status = %response.status(), "peer returned non-success status");
                false
            }
            Err(err) => {
                debug!(peer = %peer.peer_address, %err, "send failed");
                false
            }
        }
    }

    /// Sends a bare GET to a single peer and decodes the JSON response, used by the connect and
    /// discovery workers (`getInfo`, `getPeers`) rather than the batch fan-out above.
    pub(super) async fn get_json<R>(&self, peer_address: &str, path: &str) -> Result<R, crate::error::NetworkError>
    where
        R: serde::de::DeserializeOwned,
    {
        let url = format!("http://{peer_address}{path}");
        let response = self.http.get(&url).send().await.map_err(|err| {
            if err.is_timeout() {
                crate::error::NetworkError::ReadTimeout
            } else if err.is_connect() {
                crate::error::NetworkError::Refused
            } else {
                crate::error::NetworkError::Transport(err.to_string())
            }
        })?;
        response
            .json::<R>()
            .await
            .map_err(|err| crate::error::NetworkError::BadResponse(err.to_string()))
    }
}

fn now_millis() -> u64 {
    crate::time::now() as u64 * 1000
}

#[async_trait::async_trait]
impl crate::pool::Broadcaster for GossipClient {
    async fn broadcast_transactions(&self, transactions: &[crate::transaction::Transaction]) {
        let request = super::protocol::ProcessTransactionsRequest {
            transactions: transactions
                .iter()
                .map(crate::transaction::wire::TransactionJson::from_transaction)
                .collect(),
        };
        self.send_to_some_peers("/processTransactions", &request).await;
    }
}

/// `getUnconfirmedTransactions` (§4.7's pull worker, §6). A malformed entry in the response is
/// logged and dropped rather than failing the whole pull — one bad peer must not poison the pool.
#[async_trait::async_trait]
impl crate::pool::PeerTransactionSource for GossipClient {
    async fn fetch_unconfirmed(&self, peer_address: &str) -> Vec<crate::transaction::Transaction> {
        let response: super::protocol::UnconfirmedTransactionsResponse =
            match self.get_json(peer_address, "/getUnconfirmedTransactions").await {
                Ok(response) => response,
                Err(err) => {
                    debug!(peer = peer_address, %err, "getUnconfirmedTransactions failed");
                    return Vec::new();
                }
            };
        response
            .unconfirmed_transactions
            .into_iter()
            .filter_map(|json| match json.into_transaction() {
                Ok(tx) => Some(tx),
                Err(err) => {
                    debug!(peer = peer_address, %err, "dropping malformed unconfirmed transaction");
                    None
                }
            })
            .collect()
    }
}
