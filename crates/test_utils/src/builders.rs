//! Test Data Builders
//!
//! Provides builder patterns for constructing bills and services with
//! sensible defaults. Tests specify only the fields they care about.

use std::sync::Arc;

use chrono::Utc;
use core_kernel::{Currency, EventBus, InMemoryEventBus};
use domain_billing::{Bill, BillEvent, BillStore, BillingService, InMemoryBillStore, LineItem};

use crate::fixtures::StringFixtures;

/// Builder for constructing test bills
pub struct TestBillBuilder {
    currency: Currency,
    line_items: Vec<(String, f64, Currency)>,
    closed: bool,
}

impl Default for TestBillBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBillBuilder {
    /// Creates a new builder for an open, empty USD bill
    pub fn new() -> Self {
        Self {
            currency: Currency::USD,
            line_items: Vec::new(),
            closed: false,
        }
    }

    /// Sets the settlement currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Adds a line item with the default description
    pub fn with_line_item(self, amount: f64, currency: Currency) -> Self {
        self.with_described_line_item(StringFixtures::line_item_description(), amount, currency)
    }

    pub fn with_described_line_item(
        mut self,
        description: impl Into<String>,
        amount: f64,
        currency: Currency,
    ) -> Self {
        self.line_items.push((description.into(), amount, currency));
        self
    }

    /// Closes the bill after all line items are added
    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    /// Builds the bill in memory without storing it
    pub fn build(self) -> Bill {
        let mut bill = Bill::open(self.currency);
        for (description, amount, currency) in self.line_items {
            bill.add_line_item(LineItem::new(description, amount, currency))
                .expect("builder bill is open while adding line items");
        }
        if self.closed {
            bill.close(Utc::now()).expect("builder bill is closed once");
        }
        bill
    }

    /// Builds the bill through a service, so it is stored and its events
    /// are published
    pub fn build_with<S: BillStore>(self, service: &BillingService<S>) -> Bill {
        let bill = service
            .create_bill(Some(self.currency.code()))
            .expect("create test bill");
        for (description, amount, currency) in self.line_items {
            service
                .add_line_item(&bill.id(), description, amount, currency.code())
                .expect("add test line item");
        }
        if self.closed {
            service.close_bill(&bill.id()).expect("close test bill");
        }
        service.get_bill(&bill.id()).expect("read back test bill")
    }
}

/// A service over a fresh in-memory store
pub fn in_memory_service() -> BillingService<InMemoryBillStore> {
    BillingService::new(Arc::new(InMemoryBillStore::new()))
}

/// A service over a fresh in-memory store that publishes to the returned bus
pub fn in_memory_service_with_bus() -> (
    BillingService<InMemoryBillStore>,
    Arc<InMemoryEventBus<BillEvent>>,
) {
    let bus = Arc::new(InMemoryEventBus::new(InMemoryEventBus::<BillEvent>::DEFAULT_CAPACITY));
    let shared: Arc<dyn EventBus<BillEvent>> = bus.clone();
    (in_memory_service().with_event_bus(shared), bus)
}
