//! Transactions: payload decoding and dispatch.
//!
//! A [`Transaction`] is a decoded payload plus the envelope the
//! blockchain layer established for it: sender, optional receiver, block
//! position, hash, and block time. The envelope is trusted input — the
//! surrounding node has already verified signatures and inclusion.

/// Fixed-layout payload decoding.
pub mod packet;

/// Per-type validation and routing.
pub mod dispatch;

use crate::types::order::Txid;
use packet::{interpret_packet, PacketError, ParsedPacket, Payload};

pub use dispatch::{Disposition, FeatureSchedule, MetaDex};
pub use packet::{type_label, tx_type};

/// One protocol transaction, decoded and ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Signing address.
    pub sender: String,
    /// Output address, for types that deliver to one.
    pub receiver: Option<String>,
    /// Block height of inclusion.
    pub block: u32,
    /// Position within the block.
    pub idx: u32,
    /// Hash of the enclosing transaction.
    pub txid: Txid,
    /// Timestamp of the enclosing block.
    pub block_time: i64,
    /// Protocol version field of the payload.
    pub version: u16,
    /// Transaction type field of the payload.
    pub tx_type: u16,
    /// Decoded type-specific fields.
    pub payload: Payload,
}

impl Transaction {
    /// Decode a raw payload under the given envelope.
    #[allow(clippy::too_many_arguments)]
    pub fn from_packet(
        sender: impl Into<String>,
        receiver: Option<String>,
        block: u32,
        idx: u32,
        txid: Txid,
        block_time: i64,
        pkt: &[u8],
    ) -> Result<Transaction, PacketError> {
        let ParsedPacket {
            version,
            tx_type,
            payload,
        } = interpret_packet(pkt)?;
        Ok(Transaction {
            sender: sender.into(),
            receiver,
            block,
            idx,
            txid,
            block_time,
            version,
            tx_type,
            payload,
        })
    }
}
