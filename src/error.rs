//! Error types for the MetaDEx core.
//!
//! ## Two Error Regimes
//!
//! The core distinguishes two kinds of failure:
//!
//! 1. **Transaction rejections** ([`RejectReason`]): expected and routine.
//!    Bad amounts, unknown properties, cross-ecosystem pairs, insufficient
//!    balance, malformed packets. The transaction is recorded as invalid
//!    with a consensus-observable negative code and no state changes.
//!
//! 2. **Consensus errors** ([`ConsensusError`]): fatal. A balance update
//!    that would go negative, an integer-range breach in the rational
//!    arithmetic, a duplicate order insert, a broken matching postcondition.
//!    These indicate a consensus bug or corrupt state; the node must halt
//!    rather than diverge.
//!
//! No operation is retried. The rejection codes are observable through
//! the transaction log and are part of consensus.

use thiserror::Error;

use crate::ledger::TallyKind;
use crate::registry::PropertyId;
use crate::tx::packet::PacketError;

/// Routine transaction-level validation failure.
///
/// Every variant maps to a fixed negative code via [`RejectReason::code`].
/// Codes are disjoint within a transaction family; the family is implied
/// by the transaction type being processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// Transaction type or version not permitted at this block height.
    #[error("type {tx_type} or version {version} not permitted at block {block}")]
    NotPermitted {
        /// Transaction type field of the payload
        tx_type: u16,
        /// Version field of the payload
        version: u16,
        /// Block height the transaction arrived in
        block: u32,
    },

    /// Sender's balance does not cover the transaction amount.
    #[error("insufficient balance of property {property}: {available} < {required}")]
    InsufficientBalance {
        /// Property being spent
        property: PropertyId,
        /// Amount the transaction needs
        required: i64,
        /// Amount the sender actually holds
        available: i64,
    },

    /// Property for sale and desired property are the same.
    #[error("property for sale and desired property must not be equal: {0}")]
    SelfPair(PropertyId),

    /// The two properties live in different ecosystems.
    #[error("properties {0} and {1} are not in the same ecosystem")]
    CrossEcosystem(PropertyId, PropertyId),

    /// The property offered for sale does not exist.
    #[error("property for sale {0} does not exist")]
    SalePropertyMissing(PropertyId),

    /// The desired property does not exist.
    #[error("desired property {0} does not exist")]
    DesiredPropertyMissing(PropertyId),

    /// Amount for sale is zero or exceeds the signed 64-bit range.
    #[error("amount for sale out of range or zero: {0}")]
    SaleAmountOutOfRange(u64),

    /// Desired amount is zero or exceeds the signed 64-bit range.
    #[error("desired amount out of range or zero: {0}")]
    DesiredAmountOutOfRange(u64),

    /// Neither side of the trade is an ecosystem base token.
    #[error("one side of the pair [{0}, {1}] must be a base token")]
    NoBaseToken(PropertyId, PropertyId),

    /// Zero or negative unit price (zero amounts slipped through).
    #[error("zero or negative unit price")]
    BadPrice,

    /// Cancel-at-price matched no open order of the sender.
    #[error("no open orders matched the cancel-at-price")]
    CancelPriceNoOrders,

    /// Cancel-at-price found no market for the property at all.
    #[error("no market exists for property {0}")]
    CancelPriceNoMarket(PropertyId),

    /// Cancel-pair matched no open order of the sender.
    #[error("no open orders matched the cancel-pair")]
    CancelPairNoOrders,

    /// Cancel-pair found no market for the property at all.
    #[error("no market exists for property {0}")]
    CancelPairNoMarket(PropertyId),

    /// Cancel-ecosystem removed nothing.
    #[error("no open orders in ecosystem {0}")]
    CancelEcosystemNoOrders(u8),

    /// Transfer or issuance value is zero or exceeds the signed 64-bit range.
    #[error("value out of range or zero: {0}")]
    ValueOutOfRange(u64),

    /// Referenced property does not exist.
    #[error("property {0} does not exist")]
    PropertyMissing(PropertyId),

    /// Ecosystem byte is neither main (1) nor test (2).
    #[error("invalid ecosystem: {0}")]
    InvalidEcosystem(u8),

    /// Property type is neither indivisible (1) nor divisible (2).
    #[error("invalid property type: {0}")]
    InvalidPropertyType(u16),

    /// Property name must not be empty.
    #[error("property name must not be empty")]
    EmptyPropertyName,

    /// Crowdsale deadline is in the past.
    #[error("deadline {deadline} is before block time {block_time}")]
    DeadlinePassed {
        /// Deadline carried by the payload
        deadline: u64,
        /// Timestamp of the enclosing block
        block_time: i64,
    },

    /// Sender already runs an active crowdsale.
    #[error("sender {0} has an active crowdsale")]
    ActiveCrowdsale(String),

    /// Alert packet does not carry the alert version.
    #[error("invalid alert version: {0}")]
    AlertBadVersion(u16),

    /// Alert sender is not on the authorized list.
    #[error("sender {0} is not authorized for alerts")]
    AlertUnauthorized(String),

    /// Alert string does not split into the expected five fields.
    #[error("badly formed alert string")]
    AlertMalformed,

    /// Alert numeric field failed to parse.
    #[error("failed to parse alert field values")]
    AlertBadField,

    /// The transaction type delivers to a receiver, but none was present.
    #[error("transaction carries no receiver address")]
    MissingReceiver,

    /// Payload failed structural decoding.
    #[error("malformed packet: {0}")]
    MalformedPacket(#[from] PacketError),
}

impl RejectReason {
    /// Consensus-observable code recorded in the transaction log.
    ///
    /// Codes are disjoint within each transaction family; `0` is reserved
    /// for success.
    pub fn code(&self) -> i32 {
        match self {
            RejectReason::NotPermitted { .. } => -22,
            RejectReason::InsufficientBalance { .. } => -25,
            RejectReason::SelfPair(_) => -29,
            RejectReason::CrossEcosystem(..) => -30,
            RejectReason::SalePropertyMissing(_) => -31,
            RejectReason::DesiredPropertyMissing(_) => -32,
            RejectReason::SaleAmountOutOfRange(_) => -33,
            RejectReason::DesiredAmountOutOfRange(_) => -34,
            RejectReason::NoBaseToken(..) => -35,
            RejectReason::BadPrice => -66,
            RejectReason::CancelPriceNoOrders => -20,
            RejectReason::CancelPriceNoMarket(_) => -21,
            RejectReason::CancelPairNoOrders => -30,
            RejectReason::CancelPairNoMarket(_) => -31,
            RejectReason::CancelEcosystemNoOrders(_) => -40,
            RejectReason::ValueOutOfRange(_) => -23,
            RejectReason::PropertyMissing(_) => -24,
            RejectReason::InvalidEcosystem(_) => -21,
            RejectReason::InvalidPropertyType(_) => -36,
            RejectReason::EmptyPropertyName => -37,
            RejectReason::DeadlinePassed { .. } => -38,
            RejectReason::ActiveCrowdsale(_) => -39,
            RejectReason::AlertBadVersion(_) => -50,
            RejectReason::AlertUnauthorized(_) => -51,
            RejectReason::AlertMalformed => -52,
            RejectReason::AlertBadField => -53,
            RejectReason::MissingReceiver => -99,
            RejectReason::MalformedPacket(_) => -98,
        }
    }
}

/// Fatal invariant violation.
///
/// Anything producing one of these means consensus state is already suspect.
/// Block processing must stop; replaying from a snapshot is the only
/// recovery. These are never returned for bad user input — the dispatcher
/// filters that out first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// A tally update would drive a balance below zero.
    #[error("tally update for {address}/{property}/{kind} would go negative (delta {delta})")]
    NegativeTally {
        /// Address whose tally was being updated
        address: String,
        /// Property of the tally
        property: PropertyId,
        /// Which column of the tally
        kind: TallyKind,
        /// The delta that was applied
        delta: i64,
    },

    /// An intermediate product left the 128-bit range.
    #[error("128-bit arithmetic overflow in price computation")]
    Overflow,

    /// A rational conversion left the signed 64-bit range.
    #[error("value {0} outside the signed 64-bit range")]
    OutOfRange(i128),

    /// An order with an identical (block, idx) already rests at this price.
    #[error("duplicate order at block {block} idx {idx}")]
    DuplicateOrder {
        /// Block height of the colliding order
        block: u32,
        /// Intra-block index of the colliding order
        idx: u32,
    },

    /// A pre- or postcondition of the matching algorithm failed.
    #[error("matching invariant violated: {0}")]
    MatchInvariant(&'static str),
}
