//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for bills that give more
//! meaningful error messages than standard assertions.

use domain_billing::{Bill, BillStatus};

/// Asserts that two amounts are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the amounts differ by more than `tolerance`
pub fn assert_amount_approx_eq(actual: f64, expected: f64, tolerance: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "Amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that a bill is open and has no close timestamp
pub fn assert_bill_open(bill: &Bill) {
    assert_eq!(
        bill.status(),
        BillStatus::Open,
        "Expected bill {} to be open",
        bill.id()
    );
    assert!(
        bill.closed_at().is_none(),
        "Open bill {} has a closedAt",
        bill.id()
    );
}

/// Asserts that a bill is closed and carries its close timestamp
pub fn assert_bill_closed(bill: &Bill) {
    assert_eq!(
        bill.status(),
        BillStatus::Closed,
        "Expected bill {} to be closed",
        bill.id()
    );
    let closed_at = bill
        .closed_at()
        .unwrap_or_else(|| panic!("Closed bill {} has no closedAt", bill.id()));
    assert!(
        closed_at >= bill.created_at(),
        "Bill {} closed before it was created",
        bill.id()
    );
}

/// Asserts that the running total agrees with a full recomputation
pub fn assert_total_consistent(bill: &Bill) {
    let recomputed = bill.recomputed_total();
    assert_amount_approx_eq(
        bill.total_amount(),
        recomputed,
        1e-6 * recomputed.abs().max(1.0),
    );
}

/// Asserts the display total against an expected `"<amount> <code>"` string
pub fn assert_total_display(bill: &Bill, expected: &str) {
    assert_eq!(
        bill.total_display(),
        expected,
        "Unexpected display total for bill {} (raw total {})",
        bill.id(),
        bill.total_amount()
    );
}
