//! Fixed-layout binary payload decoding.
//!
//! ## Wire Format
//!
//! Every payload starts with two big-endian `u16`s — version, then type —
//! followed by type-specific fields. Multi-byte integers are network byte
//! order throughout. Property-creation payloads carry five NUL-terminated
//! strings between the fixed header and the numeric tail.
//!
//! Decoding is strict: a short payload, a string running past the packet
//! end, or an unknown type all reject the transaction before any
//! validation runs.

use thiserror::Error;

/// A payload that failed structural decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// The payload ended before a fixed-layout field.
    #[error("packet too short: {have} bytes, need at least {need}")]
    Truncated {
        /// Bytes present.
        have: usize,
        /// Bytes the layout requires.
        need: usize,
    },

    /// A NUL-terminated string ran past the declared packet size.
    #[error("string field runs past the end of the packet")]
    StringOverrun,

    /// The type field is not one this node interprets.
    #[error("unsupported transaction type {0}")]
    UnsupportedType(u16),
}

/// Decoded type-specific fields.
///
/// Amounts stay `u64` here; range validation down to `i64` happens in the
/// dispatcher so that out-of-range values reject with the documented
/// codes rather than failing to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Type 1: move tokens to the receiver address.
    SimpleSend {
        /// Property to transfer.
        property: u32,
        /// Amount in willets.
        amount: u64,
    },

    /// Type 25: place an offer and match it.
    MetaDexTrade {
        /// Property offered.
        property: u32,
        /// Amount offered.
        amount_forsale: u64,
        /// Property requested.
        desired_property: u32,
        /// Amount requested.
        amount_desired: u64,
    },

    /// Type 26: cancel offers at one exact price.
    MetaDexCancelPrice {
        /// Property offered by the orders to cancel.
        property: u32,
        /// Amount-for-sale side of the price.
        amount_forsale: u64,
        /// Desired property of the orders to cancel.
        desired_property: u32,
        /// Amount-desired side of the price.
        amount_desired: u64,
    },

    /// Type 27: cancel all offers for one pair.
    MetaDexCancelPair {
        /// Property offered by the orders to cancel.
        property: u32,
        /// Desired property of the orders to cancel.
        desired_property: u32,
    },

    /// Type 28: cancel everything in one ecosystem.
    MetaDexCancelEcosystem {
        /// Ecosystem byte: 1 main, 2 test.
        ecosystem: u8,
    },

    /// Type 50: create a fixed-issuance property.
    CreatePropertyFixed {
        /// Ecosystem byte.
        ecosystem: u8,
        /// 1 indivisible, 2 divisible.
        prop_type: u16,
        /// Predecessor property, zero for new.
        prev_prop_id: u32,
        /// Free-text metadata.
        category: String,
        /// Free-text metadata.
        subcategory: String,
        /// Display name.
        name: String,
        /// Free-text metadata.
        url: String,
        /// Free-text metadata.
        data: String,
        /// Tokens to create.
        amount: u64,
    },

    /// Type 51: create a crowdsale property.
    CreatePropertyVariable {
        /// Ecosystem byte.
        ecosystem: u8,
        /// 1 indivisible, 2 divisible.
        prop_type: u16,
        /// Predecessor property, zero for new.
        prev_prop_id: u32,
        /// Free-text metadata.
        category: String,
        /// Free-text metadata.
        subcategory: String,
        /// Display name.
        name: String,
        /// Free-text metadata.
        url: String,
        /// Free-text metadata.
        data: String,
        /// Property the crowdsale collects.
        desired_property: u32,
        /// Tokens granted per collected unit.
        tokens_per_unit: u64,
        /// Participation deadline, unix seconds.
        deadline: u64,
        /// Early-bird bonus percent per week.
        early_bird: u8,
        /// Issuer bonus percent.
        percentage: u8,
    },

    /// Type 65535: protocol alert, fields still packed in one string.
    Alert {
        /// `alertType:expiry:typeCheck:verCheck:message`
        raw: String,
    },
}

/// Version, type, and decoded fields of one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPacket {
    /// Protocol version field.
    pub version: u16,
    /// Transaction type field.
    pub tx_type: u16,
    /// Type-specific fields.
    pub payload: Payload,
}

/// Transaction type constants this node interprets.
pub mod tx_type {
    /// Simple send.
    pub const SIMPLE_SEND: u16 = 1;
    /// MetaDEx trade.
    pub const METADEX_TRADE: u16 = 25;
    /// MetaDEx cancel-price.
    pub const METADEX_CANCEL_PRICE: u16 = 26;
    /// MetaDEx cancel-pair.
    pub const METADEX_CANCEL_PAIR: u16 = 27;
    /// MetaDEx cancel-ecosystem.
    pub const METADEX_CANCEL_ECOSYSTEM: u16 = 28;
    /// Create property, fixed issuance.
    pub const CREATE_PROPERTY_FIXED: u16 = 50;
    /// Create property, crowdsale.
    pub const CREATE_PROPERTY_VARIABLE: u16 = 51;
    /// Protocol alert.
    pub const ALERT: u16 = 0xFFFF;
}

/// Label for a transaction type, for the log.
pub fn type_label(tx_type: u16) -> &'static str {
    match tx_type {
        tx_type::SIMPLE_SEND => "Simple Send",
        tx_type::METADEX_TRADE => "MetaDEx trade",
        tx_type::METADEX_CANCEL_PRICE => "MetaDEx cancel-price",
        tx_type::METADEX_CANCEL_PAIR => "MetaDEx cancel-pair",
        tx_type::METADEX_CANCEL_ECOSYSTEM => "MetaDEx cancel-ecosystem",
        tx_type::CREATE_PROPERTY_FIXED => "Create Property - Fixed",
        tx_type::CREATE_PROPERTY_VARIABLE => "Create Property - Variable",
        tx_type::ALERT => "ALERT",
        _ => "* unknown type *",
    }
}

/// Decode one payload.
pub fn interpret_packet(pkt: &[u8]) -> Result<ParsedPacket, PacketError> {
    need(pkt, 4)?;
    let version = read_u16(pkt, 0);
    let tx = read_u16(pkt, 2);

    let payload = match tx {
        tx_type::SIMPLE_SEND => interpret_simple_send(pkt)?,
        tx_type::METADEX_TRADE => interpret_metadex_trade(pkt, false)?,
        tx_type::METADEX_CANCEL_PRICE => interpret_metadex_trade(pkt, true)?,
        tx_type::METADEX_CANCEL_PAIR => interpret_cancel_pair(pkt)?,
        tx_type::METADEX_CANCEL_ECOSYSTEM => interpret_cancel_ecosystem(pkt)?,
        tx_type::CREATE_PROPERTY_FIXED => interpret_create_fixed(pkt)?,
        tx_type::CREATE_PROPERTY_VARIABLE => interpret_create_variable(pkt)?,
        tx_type::ALERT => interpret_alert(pkt)?,
        other => return Err(PacketError::UnsupportedType(other)),
    };

    Ok(ParsedPacket {
        version,
        tx_type: tx,
        payload,
    })
}

// ============================================================================
// Field readers
// ============================================================================

fn need(pkt: &[u8], len: usize) -> Result<(), PacketError> {
    if pkt.len() < len {
        Err(PacketError::Truncated {
            have: pkt.len(),
            need: len,
        })
    } else {
        Ok(())
    }
}

fn read_u16(pkt: &[u8], off: usize) -> u16 {
    u16::from_be_bytes([pkt[off], pkt[off + 1]])
}

fn read_u32(pkt: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([pkt[off], pkt[off + 1], pkt[off + 2], pkt[off + 3]])
}

fn read_u64(pkt: &[u8], off: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&pkt[off..off + 8]);
    u64::from_be_bytes(buf)
}

/// Read a NUL-terminated string and advance the cursor past the NUL.
///
/// A string still running at the packet end is an overrun and rejects
/// the whole payload.
fn read_cstring(pkt: &[u8], off: &mut usize) -> Result<String, PacketError> {
    let rest = &pkt[(*off).min(pkt.len())..];
    let nul = rest
        .iter()
        .position(|b| *b == 0)
        .ok_or(PacketError::StringOverrun)?;
    let s = String::from_utf8_lossy(&rest[..nul]).into_owned();
    *off += nul + 1;
    Ok(s)
}

// ============================================================================
// Per-type layouts
// ============================================================================

/// Tx 1
fn interpret_simple_send(pkt: &[u8]) -> Result<Payload, PacketError> {
    need(pkt, 16)?;
    Ok(Payload::SimpleSend {
        property: read_u32(pkt, 4),
        amount: read_u64(pkt, 8),
    })
}

/// Tx 25 / 26 — identical 24-byte body.
fn interpret_metadex_trade(pkt: &[u8], cancel: bool) -> Result<Payload, PacketError> {
    need(pkt, 28)?;
    let property = read_u32(pkt, 4);
    let amount_forsale = read_u64(pkt, 8);
    let desired_property = read_u32(pkt, 16);
    let amount_desired = read_u64(pkt, 20);
    Ok(if cancel {
        Payload::MetaDexCancelPrice {
            property,
            amount_forsale,
            desired_property,
            amount_desired,
        }
    } else {
        Payload::MetaDexTrade {
            property,
            amount_forsale,
            desired_property,
            amount_desired,
        }
    })
}

/// Tx 27
fn interpret_cancel_pair(pkt: &[u8]) -> Result<Payload, PacketError> {
    need(pkt, 12)?;
    Ok(Payload::MetaDexCancelPair {
        property: read_u32(pkt, 4),
        desired_property: read_u32(pkt, 8),
    })
}

/// Tx 28
fn interpret_cancel_ecosystem(pkt: &[u8]) -> Result<Payload, PacketError> {
    need(pkt, 5)?;
    Ok(Payload::MetaDexCancelEcosystem { ecosystem: pkt[4] })
}

/// Tx 50
fn interpret_create_fixed(pkt: &[u8]) -> Result<Payload, PacketError> {
    need(pkt, 25)?;
    let ecosystem = pkt[4];
    let prop_type = read_u16(pkt, 5);
    let prev_prop_id = read_u32(pkt, 7);

    let mut off = 11usize;
    let category = read_cstring(pkt, &mut off)?;
    let subcategory = read_cstring(pkt, &mut off)?;
    let name = read_cstring(pkt, &mut off)?;
    let url = read_cstring(pkt, &mut off)?;
    let data = read_cstring(pkt, &mut off)?;

    need(pkt, off + 8)?;
    let amount = read_u64(pkt, off);

    Ok(Payload::CreatePropertyFixed {
        ecosystem,
        prop_type,
        prev_prop_id,
        category,
        subcategory,
        name,
        url,
        data,
        amount,
    })
}

/// Tx 51
fn interpret_create_variable(pkt: &[u8]) -> Result<Payload, PacketError> {
    need(pkt, 39)?;
    let ecosystem = pkt[4];
    let prop_type = read_u16(pkt, 5);
    let prev_prop_id = read_u32(pkt, 7);

    let mut off = 11usize;
    let category = read_cstring(pkt, &mut off)?;
    let subcategory = read_cstring(pkt, &mut off)?;
    let name = read_cstring(pkt, &mut off)?;
    let url = read_cstring(pkt, &mut off)?;
    let data = read_cstring(pkt, &mut off)?;

    need(pkt, off + 22)?;
    let desired_property = read_u32(pkt, off);
    let tokens_per_unit = read_u64(pkt, off + 4);
    let deadline = read_u64(pkt, off + 12);
    let early_bird = pkt[off + 20];
    let percentage = pkt[off + 21];

    Ok(Payload::CreatePropertyVariable {
        ecosystem,
        prop_type,
        prev_prop_id,
        category,
        subcategory,
        name,
        url,
        data,
        desired_property,
        tokens_per_unit,
        deadline,
        early_bird,
        percentage,
    })
}

/// Tx 65535 — the colon-separated fields are validated at dispatch.
fn interpret_alert(pkt: &[u8]) -> Result<Payload, PacketError> {
    need(pkt, 5)?;
    let rest = &pkt[4..];
    let end = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
    Ok(Payload::Alert {
        raw: String::from_utf8_lossy(&rest[..end]).into_owned(),
    })
}

// ============================================================================
// Unit Tests
// ============================================================================
