//! Bill aggregate root
//!
//! A Bill is the consistency boundary of the ledger. It owns its line items
//! and its running total, and it is the only place where the open → closed
//! transition happens.
//!
//! # Invariants
//!
//! - The settlement currency never changes after creation
//! - `total_amount` is the sum of every line item converted into the
//!   settlement currency at the time it was added
//! - Line items are only appended while the bill is open
//! - `closed_at` is set if and only if the bill is closed, and only once

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use core_kernel::{convert, BillId, Currency, LineItemId};

use crate::error::BillingError;

/// Bill lifecycle states
///
/// `Closed` is terminal; nothing transitions out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    /// Accepting line items
    Open,
    /// Finalized, read-only
    Closed,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Open => "open",
            BillStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a status filter names no known status
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown bill status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for BillStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(BillStatus::Open),
            "closed" => Ok(BillStatus::Closed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A single charge on a bill
///
/// Line items are immutable once created and only exist inside their bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    id: LineItemId,
    description: String,
    amount: f64,
    currency: Currency,
    created_at: DateTime<Utc>,
}

impl LineItem {
    /// Creates a line item stamped with a fresh id and the current time
    pub fn new(description: impl Into<String>, amount: f64, currency: Currency) -> Self {
        Self {
            id: LineItemId::new(),
            description: description.into(),
            amount,
            currency,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> LineItemId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Amount in the line item's own currency
    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Amount expressed in `target`
    pub fn amount_in(&self, target: Currency) -> f64 {
        convert(self.amount, self.currency, target)
    }
}

/// The billing aggregate
///
/// Serialized with a derived `totalAmountDisplay` string next to the raw
/// total (see [`BillRecord`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "BillRecord", try_from = "BillRecord")]
pub struct Bill {
    id: BillId,
    status: BillStatus,
    currency: Currency,
    total_amount: f64,
    line_items: Vec<LineItem>,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl Bill {
    /// Opens a new, empty bill settled in `currency`
    pub fn open(currency: Currency) -> Self {
        Self {
            id: BillId::new(),
            status: BillStatus::Open,
            currency,
            total_amount: 0.0,
            line_items: Vec::new(),
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn id(&self) -> BillId {
        self.id
    }

    pub fn status(&self) -> BillStatus {
        self.status
    }

    /// Settlement currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Running total in the settlement currency
    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    /// Line items in insertion order
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn is_open(&self) -> bool {
        self.status == BillStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == BillStatus::Closed
    }

    /// Total formatted as `"<amount to 2dp> <code>"`
    pub fn total_display(&self) -> String {
        self.currency.format_amount(self.total_amount)
    }

    /// Fails with [`BillingError::BillClosed`] unless the bill is open
    pub fn ensure_open(&self) -> Result<(), BillingError> {
        if self.is_closed() {
            return Err(BillingError::BillClosed(self.id.to_string()));
        }
        Ok(())
    }

    /// Appends a line item and accrues its converted amount
    ///
    /// # Returns
    ///
    /// The amount added to the total, in the settlement currency
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::BillClosed`] if the bill is closed, or
    /// [`BillingError::InvalidAmount`] if the new total would not be a finite
    /// number. Either way the bill is left untouched.
    pub fn add_line_item(&mut self, item: LineItem) -> Result<f64, BillingError> {
        self.ensure_open()?;

        let accrued = item.amount_in(self.currency);
        let total = self.total_amount + accrued;
        if !total.is_finite() {
            return Err(BillingError::InvalidAmount(format!(
                "{:e} {}",
                item.amount(),
                item.currency()
            )));
        }

        self.total_amount = total;
        self.line_items.push(item);

        Ok(accrued)
    }

    /// Closes the bill at `at`
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::BillClosed`] if the bill is already closed.
    /// Closing is not idempotent.
    pub fn close(&mut self, at: DateTime<Utc>) -> Result<(), BillingError> {
        self.ensure_open()?;

        self.status = BillStatus::Closed;
        self.closed_at = Some(at);

        Ok(())
    }

    /// Total recomputed from scratch over every line item
    ///
    /// Agrees with [`Bill::total_amount`] up to floating-point rounding.
    pub fn recomputed_total(&self) -> f64 {
        self.line_items
            .iter()
            .map(|item| item.amount_in(self.currency))
            .sum()
    }
}

/// Wire shape of a [`Bill`]
///
/// Carries the derived `totalAmountDisplay`. On the way in the display string
/// is ignored and the lifecycle invariants are checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRecord {
    pub id: BillId,
    pub status: BillStatus,
    pub currency: Currency,
    pub total_amount: f64,
    #[serde(default)]
    pub total_amount_display: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Raised when a serialized bill breaks a lifecycle invariant
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BillRecordError {
    #[error("bill {0} is closed but has no closedAt")]
    MissingClosedAt(String),

    #[error("bill {0} is open but has a closedAt")]
    UnexpectedClosedAt(String),
}

impl From<Bill> for BillRecord {
    fn from(bill: Bill) -> Self {
        Self {
            total_amount_display: bill.total_display(),
            id: bill.id,
            status: bill.status,
            currency: bill.currency,
            total_amount: bill.total_amount,
            line_items: bill.line_items,
            created_at: bill.created_at,
            closed_at: bill.closed_at,
        }
    }
}

impl TryFrom<BillRecord> for Bill {
    type Error = BillRecordError;

    fn try_from(record: BillRecord) -> Result<Self, Self::Error> {
        match (record.status, record.closed_at) {
            (BillStatus::Closed, None) => {
                return Err(BillRecordError::MissingClosedAt(record.id.to_string()))
            }
            (BillStatus::Open, Some(_)) => {
                return Err(BillRecordError::UnexpectedClosedAt(record.id.to_string()))
            }
            _ => {}
        }

        Ok(Self {
            id: record.id,
            status: record.status,
            currency: record.currency,
            total_amount: record.total_amount,
            line_items: record.line_items,
            created_at: record.created_at,
            closed_at: record.closed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bill_is_open_and_empty() {
        let bill = Bill::open(Currency::USD);
        assert!(bill.is_open());
        assert!(bill.line_items().is_empty());
        assert_eq!(bill.total_amount(), 0.0);
        assert!(bill.closed_at().is_none());
    }

    #[test]
    fn test_add_line_item_same_currency() {
        let mut bill = Bill::open(Currency::USD);
        let accrued = bill
            .add_line_item(LineItem::new("Service fee", 10.0, Currency::USD))
            .unwrap();

        assert_eq!(accrued, 10.0);
        assert_eq!(bill.total_amount(), 10.0);
        assert_eq!(bill.line_items().len(), 1);
    }

    #[test]
    fn test_add_line_item_converts_gel_to_usd() {
        let mut bill = Bill::open(Currency::USD);
        bill.add_line_item(LineItem::new("Service fee", 100.0, Currency::GEL))
            .unwrap();

        assert!((bill.total_amount() - 37.0).abs() < 1e-9);
        // The line item keeps its original amount and currency
        assert_eq!(bill.line_items()[0].amount(), 100.0);
        assert_eq!(bill.line_items()[0].currency(), Currency::GEL);
    }

    #[test]
    fn test_closed_bill_rejects_line_items() {
        let mut bill = Bill::open(Currency::USD);
        bill.close(Utc::now()).unwrap();

        let result = bill.add_line_item(LineItem::new("Late", 1.0, Currency::USD));
        assert!(matches!(result, Err(BillingError::BillClosed(_))));
        assert!(bill.line_items().is_empty());
        assert_eq!(bill.total_amount(), 0.0);
    }

    #[test]
    fn test_overflowing_conversion_is_rejected() {
        let mut bill = Bill::open(Currency::GEL);
        let result = bill.add_line_item(LineItem::new("Huge", 1e308, Currency::USD));

        assert_eq!(
            result,
            Err(BillingError::InvalidAmount("1e308 USD".into()))
        );
        assert!(bill.line_items().is_empty());
        assert_eq!(bill.total_amount(), 0.0);
    }

    #[test]
    fn test_non_finite_amounts_never_reach_the_total() {
        let mut bill = Bill::open(Currency::USD);
        bill.add_line_item(LineItem::new("Fee", 10.0, Currency::USD))
            .unwrap();

        for amount in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let result = bill.add_line_item(LineItem::new("Bad", amount, Currency::USD));
            assert!(matches!(result, Err(BillingError::InvalidAmount(_))));
        }

        // Two finite halves that sum past f64::MAX
        bill.add_line_item(LineItem::new("Big", f64::MAX, Currency::USD))
            .unwrap();
        let result = bill.add_line_item(LineItem::new("Bigger", f64::MAX, Currency::USD));
        assert!(matches!(result, Err(BillingError::InvalidAmount(_))));

        assert_eq!(bill.line_items().len(), 2);
        assert!(bill.total_amount().is_finite());
        assert!(serde_json::to_string(&bill).is_ok());
    }

    #[test]
    fn test_close_is_not_idempotent() {
        let mut bill = Bill::open(Currency::GEL);
        let first = Utc::now();
        bill.close(first).unwrap();

        let result = bill.close(Utc::now());
        assert!(matches!(result, Err(BillingError::BillClosed(_))));
        assert_eq!(bill.closed_at(), Some(first));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("open".parse::<BillStatus>().unwrap(), BillStatus::Open);
        assert_eq!("closed".parse::<BillStatus>().unwrap(), BillStatus::Closed);
        assert!("Closed".parse::<BillStatus>().is_err());
    }

    #[test]
    fn test_serialized_bill_carries_display_total() {
        let mut bill = Bill::open(Currency::USD);
        bill.add_line_item(LineItem::new("Fee", 12.346, Currency::USD))
            .unwrap();

        let json = serde_json::to_value(&bill).unwrap();
        assert_eq!(json["totalAmount"], 12.346);
        assert_eq!(json["totalAmountDisplay"], "12.35 USD");
        assert_eq!(json["status"], "open");
        assert!(json.get("closedAt").is_none());
    }

    #[test]
    fn test_deserialize_rejects_closed_without_timestamp() {
        let bill = Bill::open(Currency::USD);
        let mut json = serde_json::to_value(&bill).unwrap();
        json["status"] = serde_json::json!("closed");

        let result: Result<Bill, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }
}
