//! Transaction pool and peer overlay core for the Nhz proof-of-stake node.
//!
//! This crate implements the consensus-adjacent data plane only: admission, replay prevention,
//! and double-spend tracking for the transaction pool, plus a weighted peer registry and gossip
//! fan-out for the overlay network. Forging, the ledger, and the HTTP admin API live elsewhere.

pub mod chain;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod events;
pub mod gossip;
pub mod hallmark;
pub mod node;
pub mod peer;
pub mod pool;
pub mod scheduler;
pub mod time;
pub mod transaction;
