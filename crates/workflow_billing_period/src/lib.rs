//! Billing-Period Workflow
//!
//! Gives every bill a billing period: a long-running task that mirrors the
//! bill's running total from the event stream and closes itself when the
//! period elapses or when the bill is closed, whichever comes first.
//!
//! # Example
//!
//! ```rust,ignore
//! let bus: Arc<dyn EventBus<BillEvent>> = Arc::new(InMemoryEventBus::default());
//! let supervisor = BillingPeriodSupervisor::new(bus.clone(), 30)?;
//! supervisor.spawn();
//!
//! let service = BillingService::new(store).with_event_bus(bus);
//! let bill = service.create_bill(Some("USD"))?;
//! // a period named `billing-period-<bill id>` is now running
//! ```

pub mod error;
pub mod period;
pub mod supervisor;

pub use error::WorkflowError;
pub use period::{
    workflow_id, BillingPeriodHandle, BillingPeriodInput, BillingPeriodSignal, BillingPeriodState,
    ClosedBy, DEFAULT_BILLING_PERIOD_DAYS, MAX_BILLING_PERIOD_DAYS,
};
pub use supervisor::BillingPeriodSupervisor;
