//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that stays inside the supported domain.

use core_kernel::Currency;
use proptest::prelude::*;

/// Strategy for generating supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop::sample::select(Currency::ALL.to_vec())
}

/// Strategy for generating supported currency codes
pub fn currency_code_strategy() -> impl Strategy<Value = &'static str> {
    currency_strategy().prop_map(|c| c.code())
}

/// Strategy for generating codes that are never supported
pub fn unsupported_currency_code_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{3}".prop_filter("must not be a supported code", |code| {
        code.parse::<Currency>().is_err()
    })
}

/// Strategy for generating line item amounts (can be negative)
pub fn amount_strategy() -> impl Strategy<Value = f64> {
    -100_000.0f64..100_000.0f64
}

/// Strategy for generating positive line item amounts
pub fn positive_amount_strategy() -> impl Strategy<Value = f64> {
    0.01f64..100_000.0f64
}

/// Strategy for generating a line item as `(description, amount, currency)`
pub fn line_item_strategy() -> impl Strategy<Value = (String, f64, Currency)> {
    ("[a-z ]{1,24}", amount_strategy(), currency_strategy())
}

/// Strategy for generating up to `max` line items
pub fn line_items_strategy(max: usize) -> impl Strategy<Value = Vec<(String, f64, Currency)>> {
    prop::collection::vec(line_item_strategy(), 0..=max)
}
