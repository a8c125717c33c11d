//! Per-module error taxonomy, composed under a single enum per the teacher's
//! `message_pool::errors::Error` shape (one enum per crate/module, `Other(String)` escape hatch).

use thiserror::Error;

/// Errors raised while validating or admitting a transaction.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("timestamp {timestamp} is more than 15s in the future of {now}")]
    TimestampInFuture { timestamp: u32, now: u32 },
    #[error("transaction expired at {expiration}, now is {now}")]
    Expired { expiration: u32, now: u32 },
    #[error("deadline {0} minutes exceeds the maximum of 1440")]
    DeadlineTooLong(u16),
    #[error("duplicate transaction id {0}")]
    DuplicateId(u64),
    #[error("signature verification failed")]
    BadSignature,
    #[error("attachment is invalid for type {ty}/{subtype}: {reason}")]
    BadAttachment { ty: u8, subtype: u8, reason: String },
    #[error("transaction hash already present in the replay index")]
    Replayed,
    #[error("transaction type {ty}/{subtype} is not yet enabled at this height")]
    NotYetEnabled { ty: u8, subtype: u8 },
    #[error("{0}")]
    Other(String),
}

/// Errors raised while applying a transaction against sender balance (insufficient funds).
#[derive(Debug, Error, Clone, Copy)]
#[error("insufficient unconfirmed balance")]
pub struct InsufficientFundsError;

/// Errors surfaced from block-undo when the chain must rescan rather than roll back.
#[derive(Debug, Error)]
#[error("undo not supported for this block: {0}")]
pub struct UndoNotSupportedError(pub String);

/// Errors from the peer overlay (connection, protocol, address validation).
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("address {0} does not resolve to a routable host")]
    Unroutable(String),
    #[error("address {0} refers to this node")]
    IsSelf(String),
    #[error("address {0} does not use the expected network port")]
    WrongNetworkPort(String),
    #[error("network error talking to peer: {0}")]
    Network(#[from] NetworkError),
    #[error("{0}")]
    Other(String),
}

/// Errors from outbound peer I/O.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("connect timed out")]
    ConnectTimeout,
    #[error("read timed out")]
    ReadTimeout,
    #[error("connection refused")]
    Refused,
    #[error("response was not valid JSON: {0}")]
    BadResponse(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors from hallmark parsing/verification.
#[derive(Debug, Error)]
pub enum HallmarkError {
    #[error("hallmark blob is malformed: {0}")]
    Malformed(String),
    #[error("hallmark signature does not verify")]
    BadSignature,
    #[error("hallmark host {hallmark_host} does not match peer host {peer_host}")]
    HostMismatch { hallmark_host: String, peer_host: String },
}

/// Errors from the binary/JSON wire codec.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("unexpected end of input while decoding {0}")]
    Truncated(&'static str),
    #[error("field {field} has invalid encoding: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("json decode error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Fatal configuration errors, surfaced only at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
