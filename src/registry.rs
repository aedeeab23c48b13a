//! Property registry: token classes, ecosystems, divisibility.
//!
//! Properties are identified by a 32-bit id and partitioned into two
//! disjoint ecosystems. Property 1 (MSC) is the main-ecosystem base token,
//! property 2 (TMSC) the test-ecosystem one. Main-ecosystem properties are
//! allocated from 3 upward, test-ecosystem properties from
//! [`TEST_ECO_FIRST_PROPERTY`] upward, so the ecosystem of any id can be
//! decided numerically even before the property exists.

use std::collections::BTreeMap;

use crate::types::order::Txid;

/// Identifier of a token class.
pub type PropertyId = u32;

/// Main-ecosystem base token.
pub const PROPERTY_MSC: PropertyId = 1;

/// Test-ecosystem base token.
pub const PROPERTY_TMSC: PropertyId = 2;

/// First id handed out to a test-ecosystem property.
pub const TEST_ECO_FIRST_PROPERTY: PropertyId = 0x8000_0003;

/// First id handed out to a main-ecosystem property.
pub const MAIN_ECO_FIRST_PROPERTY: PropertyId = 3;

/// The two disjoint ecosystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ecosystem {
    /// Real-value tokens, base token MSC.
    Main,
    /// Test tokens, base token TMSC.
    Test,
}

impl Ecosystem {
    /// Decode the wire byte: 1 is main, 2 is test, anything else invalid.
    pub fn from_byte(b: u8) -> Option<Ecosystem> {
        match b {
            1 => Some(Ecosystem::Main),
            2 => Some(Ecosystem::Test),
            _ => None,
        }
    }
}

/// Ecosystem of a property id, by the numeric allocation rule.
///
/// This intentionally works for ids that do not (yet) exist: the dispatcher
/// compares ecosystems before it checks existence.
pub fn ecosystem_of(property: PropertyId) -> Ecosystem {
    if property == PROPERTY_TMSC || property >= TEST_ECO_FIRST_PROPERTY {
        Ecosystem::Test
    } else {
        Ecosystem::Main
    }
}

/// Whether a property id is one of the two base tokens.
#[inline]
pub fn is_base_token(property: PropertyId) -> bool {
    property == PROPERTY_MSC || property == PROPERTY_TMSC
}

/// Read-only property lookups the matching core consumes.
pub trait PropertyRegistry {
    /// Whether the property has been created.
    fn exists(&self, property: PropertyId) -> bool;

    /// Whether amounts of the property are displayed with 8 decimals.
    fn is_divisible(&self, property: PropertyId) -> bool;

    /// Whether the property belongs to the test ecosystem.
    fn is_test_ecosystem(&self, property: PropertyId) -> bool {
        ecosystem_of(property) == Ecosystem::Test
    }
}

/// Everything the registry records about one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Address that created the property.
    pub issuer: String,
    /// Creating transaction.
    pub txid: Txid,
    /// Whether amounts carry 8 decimal places.
    pub divisible: bool,
    /// Tokens created (fixed issuance) or tokens per unit (crowdsale).
    pub num_tokens: i64,
    /// Free-text metadata from the creation payload.
    pub category: String,
    /// Free-text metadata from the creation payload.
    pub subcategory: String,
    /// Display name; never empty for a valid property.
    pub name: String,
    /// Free-text metadata from the creation payload.
    pub url: String,
    /// Free-text metadata from the creation payload.
    pub data: String,
    /// True for fixed issuance, false for a crowdsale.
    pub fixed: bool,
    /// Crowdsale only: property the crowdsale collects.
    pub desired_property: Option<PropertyId>,
    /// Crowdsale only: participation deadline (unix seconds).
    pub deadline: u64,
    /// Crowdsale only: early-bird bonus percent per week.
    pub early_bird: u8,
    /// Crowdsale only: issuer bonus percent.
    pub percentage: u8,
}

impl PropertyInfo {
    /// A fixed-issuance property with empty metadata, for tests and genesis.
    pub fn fixed(issuer: &str, name: &str, divisible: bool, num_tokens: i64) -> Self {
        PropertyInfo {
            issuer: issuer.to_string(),
            txid: Txid::default(),
            divisible,
            num_tokens,
            category: String::new(),
            subcategory: String::new(),
            name: name.to_string(),
            url: String::new(),
            data: String::new(),
            fixed: true,
            desired_property: None,
            deadline: 0,
            early_bird: 0,
            percentage: 0,
        }
    }
}

/// In-memory property registry.
///
/// Pre-populates the two base tokens. Ids are handed out sequentially per
/// ecosystem, which is what makes [`ecosystem_of`] a pure function of the
/// id.
#[derive(Debug)]
pub struct InMemoryRegistry {
    properties: BTreeMap<PropertyId, PropertyInfo>,
    next_main: PropertyId,
    next_test: PropertyId,
    // issuer address -> crowdsale property, while the crowdsale is open
    crowdsales: BTreeMap<String, PropertyId>,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    /// Registry holding only the two base tokens.
    pub fn new() -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(
            PROPERTY_MSC,
            PropertyInfo::fixed("", "MSC", true, 0),
        );
        properties.insert(
            PROPERTY_TMSC,
            PropertyInfo::fixed("", "Test MSC", true, 0),
        );
        InMemoryRegistry {
            properties,
            next_main: MAIN_ECO_FIRST_PROPERTY,
            next_test: TEST_ECO_FIRST_PROPERTY,
            crowdsales: BTreeMap::new(),
        }
    }

    /// Create a property in the given ecosystem, returning its new id.
    pub fn put(&mut self, ecosystem: Ecosystem, info: PropertyInfo) -> PropertyId {
        let id = match ecosystem {
            Ecosystem::Main => {
                let id = self.next_main;
                self.next_main += 1;
                id
            }
            Ecosystem::Test => {
                let id = self.next_test;
                self.next_test += 1;
                id
            }
        };
        self.properties.insert(id, info);
        id
    }

    /// Look up a property's record.
    pub fn get(&self, property: PropertyId) -> Option<&PropertyInfo> {
        self.properties.get(&property)
    }

    /// Whether the issuer currently runs a crowdsale.
    pub fn has_active_crowdsale(&self, issuer: &str) -> bool {
        self.crowdsales.contains_key(issuer)
    }

    /// Record a newly opened crowdsale for the issuer.
    pub fn open_crowdsale(&mut self, issuer: &str, property: PropertyId) {
        self.crowdsales.insert(issuer.to_string(), property);
    }

    /// Number of known properties, base tokens included.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True when only the base tokens exist.
    pub fn is_empty(&self) -> bool {
        self.properties.len() == 2
    }
}

impl PropertyRegistry for InMemoryRegistry {
    fn exists(&self, property: PropertyId) -> bool {
        self.properties.contains_key(&property)
    }

    fn is_divisible(&self, property: PropertyId) -> bool {
        self.properties
            .get(&property)
            .map(|p| p.divisible)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecosystem_of() {
        assert_eq!(ecosystem_of(PROPERTY_MSC), Ecosystem::Main);
        assert_eq!(ecosystem_of(PROPERTY_TMSC), Ecosystem::Test);
        assert_eq!(ecosystem_of(3), Ecosystem::Main);
        assert_eq!(ecosystem_of(TEST_ECO_FIRST_PROPERTY), Ecosystem::Test);
        assert_eq!(ecosystem_of(TEST_ECO_FIRST_PROPERTY + 10), Ecosystem::Test);
    }

    #[test]
    fn test_ecosystem_from_byte() {
        assert_eq!(Ecosystem::from_byte(1), Some(Ecosystem::Main));
        assert_eq!(Ecosystem::from_byte(2), Some(Ecosystem::Test));
        assert_eq!(Ecosystem::from_byte(0), None);
        assert_eq!(Ecosystem::from_byte(3), None);
    }

    #[test]
    fn test_base_tokens_preregistered() {
        let reg = InMemoryRegistry::new();
        assert!(reg.exists(PROPERTY_MSC));
        assert!(reg.exists(PROPERTY_TMSC));
        assert!(reg.is_divisible(PROPERTY_MSC));
        assert!(!reg.exists(3));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_put_allocates_per_ecosystem() {
        let mut reg = InMemoryRegistry::new();
        let a = reg.put(Ecosystem::Main, PropertyInfo::fixed("alice", "A", false, 100));
        let b = reg.put(Ecosystem::Test, PropertyInfo::fixed("bob", "B", true, 200));
        let c = reg.put(Ecosystem::Main, PropertyInfo::fixed("carol", "C", false, 300));

        assert_eq!(a, MAIN_ECO_FIRST_PROPERTY);
        assert_eq!(b, TEST_ECO_FIRST_PROPERTY);
        assert_eq!(c, MAIN_ECO_FIRST_PROPERTY + 1);
        assert_eq!(reg.len(), 5);
        assert_eq!(ecosystem_of(a), Ecosystem::Main);
        assert_eq!(ecosystem_of(b), Ecosystem::Test);
        assert_eq!(reg.get(a).unwrap().name, "A");
        assert!(!reg.is_divisible(a));
        assert!(reg.is_divisible(b));
    }

    #[test]
    fn test_crowdsale_tracking() {
        let mut reg = InMemoryRegistry::new();
        assert!(!reg.has_active_crowdsale("alice"));
        let id = reg.put(Ecosystem::Main, PropertyInfo::fixed("alice", "A", true, 1));
        reg.open_crowdsale("alice", id);
        assert!(reg.has_active_crowdsale("alice"));
    }
}
