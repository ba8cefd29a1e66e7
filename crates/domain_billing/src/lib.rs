//! Billing Domain - Bill Lifecycle and Accrual
//!
//! A bill collects line items in any supported currency and accrues them
//! into a running total in its own settlement currency until it is closed.
//!
//! # Lifecycle
//!
//! ```text
//! create_bill ──▶ Open ──add_line_item──▶ Open ──close_bill──▶ Closed
//! ```
//!
//! Closed bills are read-only. Every mutation goes through a single atomic
//! read-modify-write on the [`BillStore`], so concurrent line items on the
//! same bill are never lost.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use domain_billing::{BillingService, InMemoryBillStore};
//!
//! let service = BillingService::new(Arc::new(InMemoryBillStore::new()));
//!
//! let bill = service.create_bill(Some("USD")).unwrap();
//! let bill = service.add_line_item(&bill.id(), "Consulting", 100.0, "GEL").unwrap();
//! assert_eq!(bill.total_display(), "37.00 USD");
//! ```

pub mod bill;
pub mod error;
pub mod events;
pub mod service;
pub mod store;

pub use bill::{Bill, BillRecord, BillRecordError, BillStatus, LineItem, UnknownStatus};
pub use error::BillingError;
pub use events::{BillEvent, BillEventType};
pub use service::{parse_bill_id, BillingService};
pub use store::{BillStore, InMemoryBillStore, StoreError};
