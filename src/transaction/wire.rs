//! Binary and JSON transaction codecs (§4.8). Grounded on the teacher's dual encoding of
//! `SignedMessage` (CBOR for the wire, JSON for RPC) in `blockchain/message_pool`; this network
//! uses a fixed-width little-endian binary form and a string/hex JSON form instead, but the
//! "decode once, validate field-by-field, map failure to a single error enum" shape is the same.

use serde::{Deserialize, Serialize};

use crate::constants::{self, ForkHeight, HeightInfo};
use crate::error::WireError;
use crate::transaction::{AtomicAmount, ReferencedTransaction, Transaction};

const FIXED_HEADER_LEN: usize = 1 + 1 + 4 + 2 + 32 + 8;
const SIGNATURE_LEN: usize = 64;

struct WireFormat {
    wide_amounts: bool,
    full_hash_reference: bool,
}

fn wire_format(schedule: &[HeightInfo], current_height: i64) -> WireFormat {
    WireFormat {
        wide_amounts: constants::is_active(schedule, ForkHeight::Nqt, current_height),
        full_hash_reference: constants::is_active(
            schedule,
            ForkHeight::ReferencedTransactionFullHash,
            current_height,
        ),
    }
}

/// Serializes `tx` to its binary wire form at `current_height`'s active fork schedule.
pub fn serialize_binary(tx: &Transaction, schedule: &[HeightInfo], current_height: i64) -> Vec<u8> {
    let format = wire_format(schedule, current_height);
    let mut out = Vec::with_capacity(FIXED_HEADER_LEN + 16 + SIGNATURE_LEN + tx.attachment.len());

    out.push(tx.type_id);
    out.push(tx.subtype_id);
    out.extend_from_slice(&tx.timestamp.to_le_bytes());
    out.extend_from_slice(&tx.deadline_minutes.to_le_bytes());
    out.extend_from_slice(&tx.sender_public_key);
    out.extend_from_slice(&tx.recipient_id.to_le_bytes());

    write_amount(&mut out, tx.amount, format.wide_amounts);
    write_amount(&mut out, tx.fee, format.wide_amounts);
    write_reference(&mut out, tx.referenced_transaction, format.full_hash_reference);

    out.extend_from_slice(&tx.signature);
    out.extend_from_slice(&tx.attachment);
    out
}

fn write_amount(out: &mut Vec<u8>, amount: AtomicAmount, wide: bool) {
    match (amount, wide) {
        (AtomicAmount::Wide(v), true) => out.extend_from_slice(&v.to_le_bytes()),
        (AtomicAmount::Narrow(v), false) => out.extend_from_slice(&v.to_le_bytes()),
        (AtomicAmount::Wide(v), false) => out.extend_from_slice(&(v as i32).to_le_bytes()),
        (AtomicAmount::Narrow(v), true) => out.extend_from_slice(&i64::from(v).to_le_bytes()),
    }
}

fn write_reference(out: &mut Vec<u8>, reference: ReferencedTransaction, full_hash: bool) {
    if full_hash {
        let bytes = match reference {
            ReferencedTransaction::FullHash(h) => h,
            ReferencedTransaction::None => [0u8; 32],
            ReferencedTransaction::Id(id) => {
                let mut h = [0u8; 32];
                h[0..8].copy_from_slice(&id.to_le_bytes());
                h
            }
        };
        out.extend_from_slice(&bytes);
    } else {
        let id = match reference {
            ReferencedTransaction::Id(id) => id,
            ReferencedTransaction::None => 0,
            ReferencedTransaction::FullHash(_) => 0,
        };
        out.extend_from_slice(&id.to_le_bytes());
    }
}

/// Parses a binary wire-form transaction. `signed_bytes` is reconstructed as everything up to
/// but excluding the signature field, matching how the signature was originally computed.
pub fn parse_binary(
    bytes: &[u8],
    schedule: &[HeightInfo],
    current_height: i64,
) -> Result<Transaction, WireError> {
    let format = wire_format(schedule, current_height);
    let amount_width = if format.wide_amounts { 8 } else { 4 };
    let reference_width = if format.full_hash_reference { 32 } else { 8 };
    let variable_header = amount_width * 2 + reference_width;
    let min_len = FIXED_HEADER_LEN + variable_header + SIGNATURE_LEN;

    if bytes.len() < min_len {
        return Err(WireError::Truncated("transaction"));
    }

    let mut cursor = 0usize;
    let type_id = bytes[cursor];
    cursor += 1;
    let subtype_id = bytes[cursor];
    cursor += 1;
    let timestamp = read_u32(bytes, &mut cursor);
    let deadline_minutes = read_u16(bytes, &mut cursor);
    let sender_public_key: [u8; 32] = bytes[cursor..cursor + 32].try_into().unwrap();
    cursor += 32;
    let recipient_id = read_i64(bytes, &mut cursor);

    let amount = read_amount(bytes, &mut cursor, format.wide_amounts);
    let fee = read_amount(bytes, &mut cursor, format.wide_amounts);
    let referenced_transaction = read_reference(bytes, &mut cursor, format.full_hash_reference);

    let signed_bytes_end = cursor;
    let signature: [u8; 64] = bytes[cursor..cursor + SIGNATURE_LEN].try_into().unwrap();
    cursor += SIGNATURE_LEN;
    let attachment = bytes[cursor..].to_vec();

    let mut signed_bytes = bytes[..signed_bytes_end].to_vec();
    signed_bytes.extend_from_slice(&attachment);

    Ok(Transaction::new(
        type_id,
        subtype_id,
        timestamp,
        deadline_minutes,
        sender_public_key,
        recipient_id,
        amount,
        fee,
        referenced_transaction,
        signature,
        attachment,
        signed_bytes,
    ))
}

fn read_u16(bytes: &[u8], cursor: &mut usize) -> u16 {
    let v = u16::from_le_bytes(bytes[*cursor..*cursor + 2].try_into().unwrap());
    *cursor += 2;
    v
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> u32 {
    let v = u32::from_le_bytes(bytes[*cursor..*cursor + 4].try_into().unwrap());
    *cursor += 4;
    v
}

fn read_i64(bytes: &[u8], cursor: &mut usize) -> i64 {
    let v = i64::from_le_bytes(bytes[*cursor..*cursor + 8].try_into().unwrap());
    *cursor += 8;
    v
}

fn read_amount(bytes: &[u8], cursor: &mut usize, wide: bool) -> AtomicAmount {
    if wide {
        let v = i64::from_le_bytes(bytes[*cursor..*cursor + 8].try_into().unwrap());
        *cursor += 8;
        AtomicAmount::Wide(v)
    } else {
        let v = i32::from_le_bytes(bytes[*cursor..*cursor + 4].try_into().unwrap());
        *cursor += 4;
        AtomicAmount::Narrow(v)
    }
}

fn read_reference(bytes: &[u8], cursor: &mut usize, full_hash: bool) -> ReferencedTransaction {
    if full_hash {
        let raw: [u8; 32] = bytes[*cursor..*cursor + 32].try_into().unwrap();
        *cursor += 32;
        if raw == [0u8; 32] {
            ReferencedTransaction::None
        } else {
            ReferencedTransaction::FullHash(raw)
        }
    } else {
        let id = read_i64(bytes, cursor);
        if id == 0 {
            ReferencedTransaction::None
        } else {
            ReferencedTransaction::Id(id)
        }
    }
}

/// JSON wire form: string-decimal ids, hex-encoded byte fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionJson {
    #[serde(rename = "type")]
    pub type_id: u8,
    pub subtype: u8,
    pub timestamp: u32,
    pub deadline: u16,
    #[serde(rename = "senderPublicKey", with = "hex::serde")]
    pub sender_public_key: Vec<u8>,
    pub recipient: String,
    pub amount: String,
    pub fee: String,
    #[serde(rename = "referencedTransaction", skip_serializing_if = "Option::is_none")]
    pub referenced_transaction: Option<String>,
    #[serde(rename = "referencedTransactionFullHash", skip_serializing_if = "Option::is_none")]
    pub referenced_transaction_full_hash: Option<String>,
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub attachment: Vec<u8>,
}

impl TransactionJson {
    pub fn from_transaction(tx: &Transaction) -> Self {
        let (referenced_transaction, referenced_transaction_full_hash) = match tx.referenced_transaction
        {
            ReferencedTransaction::None => (None, None),
            ReferencedTransaction::Id(id) => (Some(id.to_string()), None),
            ReferencedTransaction::FullHash(h) => (None, Some(hex::encode(h))),
        };
        Self {
            type_id: tx.type_id,
            subtype: tx.subtype_id,
            timestamp: tx.timestamp,
            deadline: tx.deadline_minutes,
            sender_public_key: tx.sender_public_key.to_vec(),
            recipient: tx.recipient_id.to_string(),
            amount: tx.amount.as_i64().to_string(),
            fee: tx.fee.as_i64().to_string(),
            referenced_transaction,
            referenced_transaction_full_hash,
            signature: tx.signature.to_vec(),
            attachment: tx.attachment.clone(),
        }
    }

    pub fn into_transaction(self) -> Result<Transaction, WireError> {
        let recipient_id: i64 = self
            .recipient
            .parse()
            .map_err(|_| WireError::InvalidField { field: "recipient", reason: "not an integer".into() })?;
        let amount: i64 = self
            .amount
            .parse()
            .map_err(|_| WireError::InvalidField { field: "amount", reason: "not an integer".into() })?;
        let fee: i64 = self
            .fee
            .parse()
            .map_err(|_| WireError::InvalidField { field: "fee", reason: "not an integer".into() })?;

        let sender_public_key: [u8; 32] = self
            .sender_public_key
            .clone()
            .try_into()
            .map_err(|_| WireError::InvalidField { field: "senderPublicKey", reason: "must be 32 bytes".into() })?;
        let signature: [u8; 64] = self
            .signature
            .clone()
            .try_into()
            .map_err(|_| WireError::InvalidField { field: "signature", reason: "must be 64 bytes".into() })?;

        let referenced_transaction = if let Some(hash_hex) = &self.referenced_transaction_full_hash {
            let raw = hex::decode(hash_hex)?;
            let array: [u8; 32] = raw
                .try_into()
                .map_err(|_| WireError::InvalidField { field: "referencedTransactionFullHash", reason: "must be 32 bytes".into() })?;
            ReferencedTransaction::FullHash(array)
        } else if let Some(id_str) = &self.referenced_transaction {
            let id: i64 = id_str
                .parse()
                .map_err(|_| WireError::InvalidField { field: "referencedTransaction", reason: "not an integer".into() })?;
            ReferencedTransaction::Id(id)
        } else {
            ReferencedTransaction::None
        };

        // Recompute signed bytes identically to parse_binary's ordering, at the wide/narrow
        // encoding implied by the presence of a full-hash reference.
        let full_hash_reference = self.referenced_transaction_full_hash.is_some();
        let mut signed_bytes = Vec::new();
        signed_bytes.push(self.type_id);
        signed_bytes.push(self.subtype);
        signed_bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        signed_bytes.extend_from_slice(&self.deadline.to_le_bytes());
        signed_bytes.extend_from_slice(&sender_public_key);
        signed_bytes.extend_from_slice(&recipient_id.to_le_bytes());
        signed_bytes.extend_from_slice(&amount.to_le_bytes());
        signed_bytes.extend_from_slice(&fee.to_le_bytes());
        write_reference(&mut signed_bytes, referenced_transaction, full_hash_reference);
        signed_bytes.extend_from_slice(&self.attachment);

        Ok(Transaction::new(
            self.type_id,
            self.subtype,
            self.timestamp,
            self.deadline,
            sender_public_key,
            recipient_id,
            AtomicAmount::Wide(amount),
            AtomicAmount::Wide(fee),
            referenced_transaction,
            signature,
            self.attachment,
            signed_bytes,
        ))
    }
}

pub fn serialize_json(tx: &Transaction) -> Result<String, WireError> {
    Ok(serde_json::to_string(&TransactionJson::from_transaction(tx))?)
}

pub fn parse_json(json: &str) -> Result<Transaction, WireError> {
    let parsed: TransactionJson = serde_json::from_str(json)?;
    parsed.into_transaction()
}
