//! Test Fixtures
//!
//! Common values used across the test suite. The amounts are chosen so the
//! GEL/USD conversions land on round numbers.

use core_kernel::BillId;

/// Amount fixtures
pub struct AmountFixtures;

impl AmountFixtures {
    /// A flat USD fee
    pub fn usd_fee() -> f64 {
        10.0
    }

    /// 100 GEL, worth exactly 37 USD
    pub fn gel_fee() -> f64 {
        100.0
    }

    /// USD value of [`AmountFixtures::gel_fee`]
    pub fn gel_fee_in_usd() -> f64 {
        37.0
    }

    /// 37 USD, worth exactly 100 GEL
    pub fn usd_worth_100_gel() -> f64 {
        37.0
    }

    /// Tolerance for comparing converted totals
    pub fn tolerance() -> f64 {
        1e-9
    }
}

/// String fixtures
pub struct StringFixtures;

impl StringFixtures {
    pub fn line_item_description() -> &'static str {
        "Platform service fee"
    }

    pub fn unsupported_currency() -> &'static str {
        "EUR"
    }

    pub fn malformed_bill_id() -> &'static str {
        "not-a-bill-id"
    }
}

/// Identifier fixtures
pub struct IdFixtures;

impl IdFixtures {
    /// A well-formed id that no store will contain
    pub fn unknown_bill_id() -> BillId {
        BillId::new()
    }
}
