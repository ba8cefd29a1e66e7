//! Billing lifecycle service
//!
//! Orchestrates bill creation, accrual and closure on top of a [`BillStore`].
//! Every mutation is a single atomic `modify` on the store. Its event is
//! published from inside that call, once the mutation has succeeded, so the
//! order of events on the bus for a bill is the order the store committed
//! them in.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use core_kernel::{BillId, Currency, EventBus};

use crate::bill::{Bill, BillStatus, LineItem};
use crate::error::BillingError;
use crate::events::BillEvent;
use crate::store::BillStore;

/// Service for managing bills
pub struct BillingService<S: BillStore> {
    store: Arc<S>,
    events: Option<Arc<dyn EventBus<BillEvent>>>,
}

impl<S: BillStore> Clone for BillingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            events: self.events.clone(),
        }
    }
}

impl<S: BillStore> BillingService<S> {
    /// Creates a service backed by `store` that publishes nothing
    pub fn new(store: Arc<S>) -> Self {
        Self { store, events: None }
    }

    /// Publishes lifecycle events to `bus` for each successful mutation
    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus<BillEvent>>) -> Self {
        self.events = Some(bus);
        self
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Opens a new bill
    ///
    /// An absent or empty currency defaults to USD.
    ///
    /// # Errors
    ///
    /// `UnsupportedCurrency` for any other code outside GEL/USD
    pub fn create_bill(&self, currency: Option<&str>) -> Result<Bill, BillingError> {
        let currency = Currency::resolve(currency)?;
        let bill = Bill::open(currency);

        self.store.create(bill.clone())?;
        info!(bill_id = %bill.id(), currency = %currency, "Bill created");

        self.publish(BillEvent::created(&bill));
        Ok(bill)
    }

    /// Appends a line item and accrues its converted amount
    ///
    /// Checks run in a fixed order: the bill must exist, then be open, then
    /// the currency must be supported.
    ///
    /// # Errors
    ///
    /// `BillNotFound`, `BillClosed`, `UnsupportedCurrency`, or
    /// `InvalidAmount` when the total would stop being finite; on any error
    /// the stored bill is unchanged and nothing is published
    pub fn add_line_item(
        &self,
        bill_id: &BillId,
        description: impl Into<String>,
        amount: f64,
        currency: &str,
    ) -> Result<Bill, BillingError> {
        let description = description.into();

        let bill = self.store.modify(bill_id, |bill: &mut Bill| {
            bill.ensure_open()?;
            let currency: Currency = currency.parse()?;
            bill.add_line_item(LineItem::new(description, amount, currency))?;
            if let Some(item) = bill.line_items().last() {
                self.publish(BillEvent::line_item_added(bill, item));
            }
            Ok::<(), BillingError>(())
        })?;

        if let Some(item) = bill.line_items().last() {
            info!(
                bill_id = %bill.id(),
                line_item_id = %item.id(),
                amount = item.amount(),
                currency = %item.currency(),
                total = bill.total_amount(),
                "Line item added"
            );
        }

        Ok(bill)
    }

    /// Closes an open bill
    ///
    /// # Errors
    ///
    /// `BillNotFound`, or `BillClosed` when the bill is already closed
    pub fn close_bill(&self, bill_id: &BillId) -> Result<Bill, BillingError> {
        let bill = self.store.modify(bill_id, |bill: &mut Bill| {
            bill.close(Utc::now())?;
            self.publish(BillEvent::closed(bill));
            Ok::<(), BillingError>(())
        })?;

        info!(
            bill_id = %bill.id(),
            total = %bill.total_display(),
            line_items = bill.line_items().len(),
            "Bill closed"
        );

        Ok(bill)
    }

    pub fn get_bill(&self, bill_id: &BillId) -> Result<Bill, BillingError> {
        self.store
            .get(bill_id)?
            .ok_or_else(|| BillingError::BillNotFound(bill_id.to_string()))
    }

    /// Lists bills by a raw status filter
    ///
    /// `None` or `""` lists every bill; `"open"` and `"closed"` select that
    /// subset; any other string matches nothing.
    pub fn list_bills(&self, status: Option<&str>) -> Result<Vec<Bill>, BillingError> {
        match status {
            None | Some("") => self.list_bills_by_status(None),
            Some(raw) => match raw.parse::<BillStatus>() {
                Ok(status) => self.list_bills_by_status(Some(status)),
                Err(_) => {
                    debug!(status = raw, "Unknown status filter, nothing matches");
                    Ok(Vec::new())
                }
            },
        }
    }

    pub fn list_bills_by_status(
        &self,
        status: Option<BillStatus>,
    ) -> Result<Vec<Bill>, BillingError> {
        Ok(self.store.list(status)?)
    }

    /// `Ok(())` if the bill exists and is still open
    pub fn ensure_open(&self, bill_id: &BillId) -> Result<(), BillingError> {
        self.get_bill(bill_id)?.ensure_open()
    }

    /// Running total in the bill's own currency
    pub fn bill_total(&self, bill_id: &BillId) -> Result<f64, BillingError> {
        Ok(self.get_bill(bill_id)?.total_amount())
    }

    /// Number of stored bills
    pub fn bill_count(&self) -> Result<usize, BillingError> {
        Ok(self.store.len()?)
    }

    /// Hands an event to the bus without blocking, so it is safe to call
    /// while the store holds the bill locked
    fn publish(&self, event: BillEvent) {
        let Some(bus) = &self.events else {
            return;
        };
        let event_type = event.event_type;
        let bill_id = event.bill_id;
        if let Err(e) = bus.publish(event) {
            warn!(bill_id = %bill_id, event = ?event_type, error = %e, "Failed to publish bill event");
        }
    }
}

/// Parses a bill id supplied by a caller
///
/// Malformed ids cannot name a stored bill, so they are reported as
/// `BillNotFound` rather than as a separate validation error.
pub fn parse_bill_id(raw: &str) -> Result<BillId, BillingError> {
    raw.parse()
        .map_err(|_| BillingError::BillNotFound(raw.to_string()))
}
