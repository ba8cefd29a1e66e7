//! Bill lifecycle events
//!
//! Published after each successful mutation. Events are notifications, not a
//! source of truth: the store always wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BillId, Currency, LineItemId};

use crate::bill::{Bill, LineItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillEventType {
    Created,
    LineItemAdded,
    Closed,
}

/// A single lifecycle notification
///
/// `line_item_id` and `amount` are only present on `LineItemAdded`; the
/// amount is in the line item's own currency, as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillEvent {
    pub bill_id: BillId,
    pub event_type: BillEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_item_id: Option<LineItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub currency: Currency,
    pub timestamp: DateTime<Utc>,
}

impl BillEvent {
    pub fn created(bill: &Bill) -> Self {
        Self {
            bill_id: bill.id(),
            event_type: BillEventType::Created,
            line_item_id: None,
            amount: None,
            currency: bill.currency(),
            timestamp: bill.created_at(),
        }
    }

    pub fn line_item_added(bill: &Bill, item: &LineItem) -> Self {
        Self {
            bill_id: bill.id(),
            event_type: BillEventType::LineItemAdded,
            line_item_id: Some(item.id()),
            amount: Some(item.amount()),
            currency: item.currency(),
            timestamp: item.created_at(),
        }
    }

    pub fn closed(bill: &Bill) -> Self {
        Self {
            bill_id: bill.id(),
            event_type: BillEventType::Closed,
            line_item_id: None,
            amount: None,
            currency: bill.currency(),
            timestamp: bill.closed_at().unwrap_or_else(Utc::now),
        }
    }
}
