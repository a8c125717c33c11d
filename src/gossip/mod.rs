//! Peer overlay gossip: periodic workers and broadcast fan-out (§4.3, §4.4).

pub mod broadcast;
pub mod protocol;
pub mod workers;

pub use broadcast::GossipClient;
