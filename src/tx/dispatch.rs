//! Per-type validation and routing.
//!
//! [`MetaDex`] aggregates the process-wide state — book, ledger, property
//! registry, log sinks — as explicit fields rather than globals, so the
//! enclosing node controls construction order and can snapshot everything
//! at block boundaries.
//!
//! [`MetaDex::process`] applies one transaction. Validation failures
//! return [`Disposition::Invalid`] with the consensus-observable code and
//! guarantee that no state was touched. A [`ConsensusError`] escaping
//! from here means block processing must halt.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::engine;
use crate::error::{ConsensusError, RejectReason};
use crate::ledger::{BalanceLedger, TallyKind};
use crate::orderbook::{consensus_hash, MetaDexBook};
use crate::records::{
    order_status, CancelLog, MemoryCancelLog, MemoryTradeLog, OrderStatus, TradeIntent, TradeLog,
};
use crate::registry::{
    ecosystem_of, is_base_token, Ecosystem, InMemoryRegistry, PropertyId, PropertyInfo,
    PropertyRegistry,
};
use crate::types::order::{Order, SubAction, Txid};

use super::packet::{type_label, Payload};
use super::Transaction;

/// Property type byte: integer units.
const PROPERTY_TYPE_INDIVISIBLE: u16 = 1;
/// Property type byte: 8 decimal places.
const PROPERTY_TYPE_DIVISIBLE: u16 = 2;

/// Outcome of processing one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The transaction was applied.
    Valid,
    /// The transaction was rejected; nothing changed.
    Invalid(RejectReason),
}

impl Disposition {
    /// The code recorded in the transaction log; zero on success.
    pub fn code(&self) -> i32 {
        match self {
            Disposition::Valid => 0,
            Disposition::Invalid(reason) => reason.code(),
        }
    }

    /// Whether the transaction was applied.
    pub fn is_valid(&self) -> bool {
        matches!(self, Disposition::Valid)
    }
}

/// Activation heights per transaction family.
///
/// A type is live in the main ecosystem once its family's block height is
/// reached; the test ecosystem is always live. Only version 0 payloads
/// are permitted. Defaults activate everything from genesis, which is
/// what tests and fresh chains want.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureSchedule {
    /// First block for simple sends.
    pub send_block: u32,
    /// First block for the four MetaDEx types.
    pub metadex_block: u32,
    /// First block for property creation.
    pub property_block: u32,
}

impl FeatureSchedule {
    /// Whether `tx_type`/`version` is permitted at `block`.
    pub fn allowed(&self, block: u32, tx_type: u16, version: u16, test_ecosystem: bool) -> bool {
        if test_ecosystem {
            return true;
        }
        if version != 0 {
            return false;
        }
        let from = match tx_type {
            super::tx_type::SIMPLE_SEND => self.send_block,
            super::tx_type::METADEX_TRADE
            | super::tx_type::METADEX_CANCEL_PRICE
            | super::tx_type::METADEX_CANCEL_PAIR
            | super::tx_type::METADEX_CANCEL_ECOSYSTEM => self.metadex_block,
            super::tx_type::CREATE_PROPERTY_FIXED | super::tx_type::CREATE_PROPERTY_VARIABLE => {
                self.property_block
            }
            _ => return false,
        };
        block >= from
    }
}

/// The MetaDEx core: every piece of process-wide state, plus dispatch.
#[derive(Debug)]
pub struct MetaDex<T: TradeLog = MemoryTradeLog, C: CancelLog = MemoryCancelLog> {
    /// The order book.
    pub book: MetaDexBook,
    /// The balance ledger.
    pub ledger: BalanceLedger,
    /// The property registry.
    pub registry: InMemoryRegistry,
    /// Sink for accepted orders and executed fills.
    pub trade_log: T,
    /// Sink for cancellations.
    pub cancel_log: C,
    /// Activation heights.
    pub schedule: FeatureSchedule,
    /// Addresses allowed to issue protocol alerts.
    pub alert_senders: BTreeSet<String>,
    /// Message of the last accepted alert.
    pub current_alert: Option<String>,
}

impl MetaDex<MemoryTradeLog, MemoryCancelLog> {
    /// A core with in-memory sinks, everything activated from genesis.
    pub fn new() -> Self {
        Self::with_sinks(MemoryTradeLog::new(), MemoryCancelLog::new())
    }

    /// Lifecycle label of the order created by `txid`.
    pub fn order_status(&self, txid: &Txid, amount_forsale: i64) -> OrderStatus {
        order_status(&self.book, &self.trade_log, txid, amount_forsale)
    }
}

impl Default for MetaDex<MemoryTradeLog, MemoryCancelLog> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TradeLog, C: CancelLog> MetaDex<T, C> {
    /// A core writing to the given log sinks.
    pub fn with_sinks(trade_log: T, cancel_log: C) -> Self {
        MetaDex {
            book: MetaDexBook::new(),
            ledger: BalanceLedger::new(),
            registry: InMemoryRegistry::new(),
            trade_log,
            cancel_log,
            schedule: FeatureSchedule::default(),
            alert_senders: BTreeSet::new(),
            current_alert: None,
        }
    }

    /// The book's consensus hash at this instant.
    pub fn consensus_hash(&self) -> String {
        consensus_hash(&self.book)
    }

    /// Apply one transaction.
    ///
    /// Transactions must arrive in strict `(block, idx)` order; the core
    /// is synchronous and not re-entrant.
    pub fn process(&mut self, tx: &Transaction) -> Result<Disposition, ConsensusError> {
        debug!(
            "processing {} from {} in {}/{:03}",
            type_label(tx.tx_type),
            tx.sender,
            tx.block,
            tx.idx
        );

        let disposition = match tx.payload.clone() {
            Payload::SimpleSend { property, amount } => self.logic_simple_send(tx, property, amount),
            Payload::MetaDexTrade {
                property,
                amount_forsale,
                desired_property,
                amount_desired,
            } => self.logic_metadex_trade(tx, property, amount_forsale, desired_property, amount_desired),
            Payload::MetaDexCancelPrice {
                property,
                amount_forsale,
                desired_property,
                amount_desired,
            } => self.logic_metadex_cancel_price(
                tx,
                property,
                amount_forsale,
                desired_property,
                amount_desired,
            ),
            Payload::MetaDexCancelPair {
                property,
                desired_property,
            } => self.logic_metadex_cancel_pair(tx, property, desired_property),
            Payload::MetaDexCancelEcosystem { ecosystem } => {
                self.logic_metadex_cancel_ecosystem(tx, ecosystem)
            }
            Payload::CreatePropertyFixed {
                ecosystem,
                prop_type,
                category,
                subcategory,
                name,
                url,
                data,
                amount,
                ..
            } => self.logic_create_property_fixed(
                tx, ecosystem, prop_type, category, subcategory, name, url, data, amount,
            ),
            Payload::CreatePropertyVariable {
                ecosystem,
                prop_type,
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
                ..
            } => self.logic_create_property_variable(
                tx,
                ecosystem,
                prop_type,
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
            ),
            Payload::Alert { raw } => self.logic_alert(tx, &raw),
        }?;

        match &disposition {
            Disposition::Valid => info!(
                "{} {} accepted",
                type_label(tx.tx_type),
                tx.txid
            ),
            Disposition::Invalid(reason) => debug!(
                "{} {} rejected: {reason} (code {})",
                type_label(tx.tx_type),
                tx.txid,
                reason.code()
            ),
        }
        Ok(disposition)
    }

    /// Decode and apply one raw payload under the given envelope.
    #[allow(clippy::too_many_arguments)]
    pub fn process_packet(
        &mut self,
        sender: &str,
        receiver: Option<String>,
        block: u32,
        idx: u32,
        txid: Txid,
        block_time: i64,
        pkt: &[u8],
    ) -> Result<Disposition, ConsensusError> {
        match Transaction::from_packet(sender, receiver, block, idx, txid, block_time, pkt) {
            Ok(tx) => self.process(&tx),
            Err(e) => {
                debug!("packet from {sender} rejected: {e}");
                Ok(Disposition::Invalid(RejectReason::MalformedPacket(e)))
            }
        }
    }

    // ========================================================================
    // Shared checks
    // ========================================================================

    fn amount_in_range(value: u64) -> bool {
        value > 0 && value <= i64::MAX as u64
    }

    /// The common sanity block of trade and cancel-price: permission,
    /// pair, ecosystem, existence, ranges. `None` means all checks pass.
    fn metadex_pair_checks(
        &self,
        tx: &Transaction,
        property: PropertyId,
        amount_forsale: u64,
        desired_property: PropertyId,
        amount_desired: u64,
    ) -> Option<RejectReason> {
        if !self.schedule.allowed(
            tx.block,
            tx.tx_type,
            tx.version,
            self.registry.is_test_ecosystem(property),
        ) {
            return Some(RejectReason::NotPermitted {
                tx_type: tx.tx_type,
                version: tx.version,
                block: tx.block,
            });
        }
        if property == desired_property {
            return Some(RejectReason::SelfPair(property));
        }
        if ecosystem_of(property) != ecosystem_of(desired_property) {
            return Some(RejectReason::CrossEcosystem(property, desired_property));
        }
        if !self.registry.exists(property) {
            return Some(RejectReason::SalePropertyMissing(property));
        }
        if !self.registry.exists(desired_property) {
            return Some(RejectReason::DesiredPropertyMissing(desired_property));
        }
        if !Self::amount_in_range(amount_forsale) {
            return Some(RejectReason::SaleAmountOutOfRange(amount_forsale));
        }
        if !Self::amount_in_range(amount_desired) {
            return Some(RejectReason::DesiredAmountOutOfRange(amount_desired));
        }
        None
    }

    // ========================================================================
    // Tx 1
    // ========================================================================

    fn logic_simple_send(
        &mut self,
        tx: &Transaction,
        property: PropertyId,
        amount: u64,
    ) -> Result<Disposition, ConsensusError> {
        if !self.schedule.allowed(
            tx.block,
            tx.tx_type,
            tx.version,
            self.registry.is_test_ecosystem(property),
        ) {
            return reject(RejectReason::NotPermitted {
                tx_type: tx.tx_type,
                version: tx.version,
                block: tx.block,
            });
        }
        if !Self::amount_in_range(amount) {
            return reject(RejectReason::ValueOutOfRange(amount));
        }
        if !self.registry.exists(property) {
            return reject(RejectReason::PropertyMissing(property));
        }
        let amount = amount as i64;
        let balance = self.ledger.get(&tx.sender, property, TallyKind::Balance);
        if balance < amount {
            return reject(RejectReason::InsufficientBalance {
                property,
                required: amount,
                available: balance,
            });
        }
        let Some(receiver) = tx.receiver.clone() else {
            return reject(RejectReason::MissingReceiver);
        };

        self.ledger
            .update(&tx.sender, property, -amount, TallyKind::Balance)?;
        self.ledger
            .update(&receiver, property, amount, TallyKind::Balance)?;
        Ok(Disposition::Valid)
    }

    // ========================================================================
    // Tx 25
    // ========================================================================

    fn logic_metadex_trade(
        &mut self,
        tx: &Transaction,
        property: PropertyId,
        amount_forsale: u64,
        desired_property: PropertyId,
        amount_desired: u64,
    ) -> Result<Disposition, ConsensusError> {
        if let Some(reason) =
            self.metadex_pair_checks(tx, property, amount_forsale, desired_property, amount_desired)
        {
            return reject(reason);
        }
        if !is_base_token(property) && !is_base_token(desired_property) {
            return reject(RejectReason::NoBaseToken(property, desired_property));
        }

        let amount_forsale = amount_forsale as i64;
        let amount_desired = amount_desired as i64;

        let balance = self.ledger.get(&tx.sender, property, TallyKind::Balance);
        if balance < amount_forsale {
            return reject(RejectReason::InsufficientBalance {
                property,
                required: amount_forsale,
                available: balance,
            });
        }

        let order = Order::new(
            tx.sender.clone(),
            tx.block,
            tx.idx,
            tx.txid,
            property,
            amount_forsale,
            desired_property,
            amount_desired,
            SubAction::Add,
        );

        // Zero amounts are already rejected above; this guards the price
        // itself, as the engine entry always has.
        if !order.unit_price().is_positive() {
            return reject(RejectReason::BadPrice);
        }

        self.trade_log.record_trade_intent(TradeIntent {
            txid: tx.txid,
            addr: tx.sender.clone(),
            property,
            desired_property,
            block: tx.block,
            idx: tx.idx,
        });

        let outcome =
            engine::add_and_match(&mut self.book, &mut self.ledger, &mut self.trade_log, order)?;
        debug!("trade {} => {}", tx.txid, outcome.label());
        Ok(Disposition::Valid)
    }

    // ========================================================================
    // Tx 26
    // ========================================================================

    fn logic_metadex_cancel_price(
        &mut self,
        tx: &Transaction,
        property: PropertyId,
        amount_forsale: u64,
        desired_property: PropertyId,
        amount_desired: u64,
    ) -> Result<Disposition, ConsensusError> {
        if let Some(reason) =
            self.metadex_pair_checks(tx, property, amount_forsale, desired_property, amount_desired)
        {
            return reject(reason);
        }
        if !self.book.has_market(property) {
            return reject(RejectReason::CancelPriceNoMarket(property));
        }

        let removed = engine::cancel_at_price(
            &mut self.book,
            &mut self.ledger,
            &mut self.cancel_log,
            tx.txid,
            tx.block,
            &tx.sender,
            property,
            amount_forsale as i64,
            desired_property,
            amount_desired as i64,
        )?;

        if removed == 0 {
            return reject(RejectReason::CancelPriceNoOrders);
        }
        Ok(Disposition::Valid)
    }

    // ========================================================================
    // Tx 27
    // ========================================================================

    fn logic_metadex_cancel_pair(
        &mut self,
        tx: &Transaction,
        property: PropertyId,
        desired_property: PropertyId,
    ) -> Result<Disposition, ConsensusError> {
        if !self.schedule.allowed(
            tx.block,
            tx.tx_type,
            tx.version,
            self.registry.is_test_ecosystem(property),
        ) {
            return reject(RejectReason::NotPermitted {
                tx_type: tx.tx_type,
                version: tx.version,
                block: tx.block,
            });
        }
        if property == desired_property {
            return reject(RejectReason::SelfPair(property));
        }
        if ecosystem_of(property) != ecosystem_of(desired_property) {
            return reject(RejectReason::CrossEcosystem(property, desired_property));
        }
        if !self.registry.exists(property) {
            return reject(RejectReason::SalePropertyMissing(property));
        }
        if !self.registry.exists(desired_property) {
            return reject(RejectReason::DesiredPropertyMissing(desired_property));
        }
        if !self.book.has_market(property) {
            return reject(RejectReason::CancelPairNoMarket(property));
        }

        let removed = engine::cancel_all_for_pair(
            &mut self.book,
            &mut self.ledger,
            &mut self.cancel_log,
            tx.txid,
            tx.block,
            &tx.sender,
            property,
            desired_property,
        )?;

        if removed == 0 {
            return reject(RejectReason::CancelPairNoOrders);
        }
        Ok(Disposition::Valid)
    }

    // ========================================================================
    // Tx 28
    // ========================================================================

    fn logic_metadex_cancel_ecosystem(
        &mut self,
        tx: &Transaction,
        ecosystem_byte: u8,
    ) -> Result<Disposition, ConsensusError> {
        if !self.schedule.allowed(
            tx.block,
            tx.tx_type,
            tx.version,
            ecosystem_byte == 2,
        ) {
            return reject(RejectReason::NotPermitted {
                tx_type: tx.tx_type,
                version: tx.version,
                block: tx.block,
            });
        }

        // An unknown ecosystem byte matches no property and removes
        // nothing, the same observable result as an empty sweep.
        let removed = match Ecosystem::from_byte(ecosystem_byte) {
            Some(ecosystem) => engine::cancel_everything(
                &mut self.book,
                &mut self.ledger,
                &mut self.cancel_log,
                tx.txid,
                tx.block,
                &tx.sender,
                ecosystem,
            )?,
            None => 0,
        };

        if removed == 0 {
            return reject(RejectReason::CancelEcosystemNoOrders(ecosystem_byte));
        }
        Ok(Disposition::Valid)
    }

    // ========================================================================
    // Tx 50
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    fn logic_create_property_fixed(
        &mut self,
        tx: &Transaction,
        ecosystem_byte: u8,
        prop_type: u16,
        category: String,
        subcategory: String,
        name: String,
        url: String,
        data: String,
        amount: u64,
    ) -> Result<Disposition, ConsensusError> {
        let Some(ecosystem) = Ecosystem::from_byte(ecosystem_byte) else {
            return reject(RejectReason::InvalidEcosystem(ecosystem_byte));
        };
        if !self.schedule.allowed(
            tx.block,
            tx.tx_type,
            tx.version,
            ecosystem == Ecosystem::Test,
        ) {
            return reject(RejectReason::NotPermitted {
                tx_type: tx.tx_type,
                version: tx.version,
                block: tx.block,
            });
        }
        if !Self::amount_in_range(amount) {
            return reject(RejectReason::ValueOutOfRange(amount));
        }
        if prop_type != PROPERTY_TYPE_INDIVISIBLE && prop_type != PROPERTY_TYPE_DIVISIBLE {
            return reject(RejectReason::InvalidPropertyType(prop_type));
        }
        if name.is_empty() {
            return reject(RejectReason::EmptyPropertyName);
        }

        let amount = amount as i64;
        let info = PropertyInfo {
            issuer: tx.sender.clone(),
            txid: tx.txid,
            divisible: prop_type == PROPERTY_TYPE_DIVISIBLE,
            num_tokens: amount,
            category,
            subcategory,
            name,
            url,
            data,
            fixed: true,
            desired_property: None,
            deadline: 0,
            early_bird: 0,
            percentage: 0,
        };
        let property = self.registry.put(ecosystem, info);
        self.ledger
            .update(&tx.sender, property, amount, TallyKind::Balance)?;

        info!("created property {property} ({amount} tokens) for {}", tx.sender);
        Ok(Disposition::Valid)
    }

    // ========================================================================
    // Tx 51
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    fn logic_create_property_variable(
        &mut self,
        tx: &Transaction,
        ecosystem_byte: u8,
        prop_type: u16,
        category: String,
        subcategory: String,
        name: String,
        url: String,
        data: String,
        desired_property: PropertyId,
        tokens_per_unit: u64,
        deadline: u64,
        early_bird: u8,
        percentage: u8,
    ) -> Result<Disposition, ConsensusError> {
        let Some(ecosystem) = Ecosystem::from_byte(ecosystem_byte) else {
            return reject(RejectReason::InvalidEcosystem(ecosystem_byte));
        };
        if !self.schedule.allowed(
            tx.block,
            tx.tx_type,
            tx.version,
            ecosystem == Ecosystem::Test,
        ) {
            return reject(RejectReason::NotPermitted {
                tx_type: tx.tx_type,
                version: tx.version,
                block: tx.block,
            });
        }
        if !Self::amount_in_range(tokens_per_unit) {
            return reject(RejectReason::ValueOutOfRange(tokens_per_unit));
        }
        if !self.registry.exists(desired_property) {
            return reject(RejectReason::PropertyMissing(desired_property));
        }
        if prop_type != PROPERTY_TYPE_INDIVISIBLE && prop_type != PROPERTY_TYPE_DIVISIBLE {
            return reject(RejectReason::InvalidPropertyType(prop_type));
        }
        if name.is_empty() {
            return reject(RejectReason::EmptyPropertyName);
        }
        if deadline == 0 || (deadline as i64) < tx.block_time {
            return reject(RejectReason::DeadlinePassed {
                deadline,
                block_time: tx.block_time,
            });
        }
        if self.registry.has_active_crowdsale(&tx.sender) {
            return reject(RejectReason::ActiveCrowdsale(tx.sender.clone()));
        }

        let info = PropertyInfo {
            issuer: tx.sender.clone(),
            txid: tx.txid,
            divisible: prop_type == PROPERTY_TYPE_DIVISIBLE,
            num_tokens: tokens_per_unit as i64,
            category,
            subcategory,
            name,
            url,
            data,
            fixed: false,
            desired_property: Some(desired_property),
            deadline,
            early_bird,
            percentage,
        };
        let property = self.registry.put(ecosystem, info);
        self.registry.open_crowdsale(&tx.sender, property);

        info!("created crowdsale property {property} for {}", tx.sender);
        Ok(Disposition::Valid)
    }

    // ========================================================================
    // Tx 65535
    // ========================================================================

    fn logic_alert(&mut self, tx: &Transaction, raw: &str) -> Result<Disposition, ConsensusError> {
        if tx.version != 0xFFFF {
            return reject(RejectReason::AlertBadVersion(tx.version));
        }
        if !self.alert_senders.contains(&tx.sender) {
            return reject(RejectReason::AlertUnauthorized(tx.sender.clone()));
        }

        // Adjacent separators compress, so exactly five fields must come
        // out: type, expiry, type-check, version-check, message.
        let fields: Vec<&str> = raw.split(':').filter(|f| !f.is_empty()).collect();
        if fields.len() != 5 {
            return reject(RejectReason::AlertMalformed);
        }
        if fields[0].parse::<i32>().is_err()
            || fields[1].parse::<u64>().is_err()
            || fields[2].parse::<u32>().is_err()
            || fields[3].parse::<u32>().is_err()
        {
            return reject(RejectReason::AlertBadField);
        }

        info!("alert accepted from {}: {}", tx.sender, fields[4]);
        self.current_alert = Some(raw.to_string());
        Ok(Disposition::Valid)
    }
}

fn reject(reason: RejectReason) -> Result<Disposition, ConsensusError> {
    Ok(Disposition::Invalid(reason))
}

// ============================================================================
// Unit Tests
// ============================================================================
