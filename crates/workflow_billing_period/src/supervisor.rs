//! Billing period supervisor
//!
//! Subscribes to the bill event bus and keeps one billing period per bill:
//! `created` starts a period, `line_item_added` and `closed` are forwarded as
//! signals. Finished periods stay registered so their final state can still be
//! queried.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use core_kernel::{BillId, Currency, EventBus};
use domain_billing::{BillEvent, BillEventType};

use crate::error::WorkflowError;
use crate::period::{
    BillingPeriodHandle, BillingPeriodInput, BillingPeriodSignal, BillingPeriodState,
};

/// Routes bill events to per-bill billing periods
#[derive(Clone)]
pub struct BillingPeriodSupervisor {
    bus: Arc<dyn EventBus<BillEvent>>,
    billing_period_days: u32,
    periods: Arc<RwLock<HashMap<BillId, BillingPeriodHandle>>>,
    shutdown: Arc<Notify>,
}

impl BillingPeriodSupervisor {
    /// Creates a supervisor that starts periods of `billing_period_days`
    ///
    /// # Errors
    ///
    /// `WorkflowError::PeriodTooLong` if the period exceeds a year
    pub fn new(
        bus: Arc<dyn EventBus<BillEvent>>,
        billing_period_days: u32,
    ) -> Result<Self, WorkflowError> {
        BillingPeriodInput::new(BillId::new(), Currency::DEFAULT)
            .with_period_days(billing_period_days)
            .validate()?;

        Ok(Self {
            bus,
            billing_period_days,
            periods: Arc::new(RwLock::new(HashMap::new())),
            shutdown: Arc::new(Notify::new()),
        })
    }

    pub fn billing_period_days(&self) -> u32 {
        self.billing_period_days
    }

    /// Subscribes to the bus and spawns the event loop
    ///
    /// The subscription is taken before this returns, so no event published
    /// afterwards is missed. The loop ends on [`shutdown`](Self::shutdown) or
    /// when the bus closes.
    pub fn spawn(&self) -> JoinHandle<()> {
        let mut events = self.bus.subscribe();
        let supervisor = self.clone();

        tokio::spawn(async move {
            info!(
                days = supervisor.billing_period_days,
                "Billing period supervisor started"
            );

            loop {
                tokio::select! {
                    _ = supervisor.shutdown.notified() => {
                        info!("Billing period supervisor received shutdown signal");
                        break;
                    }
                    received = events.recv() => match received {
                        Ok(event) => supervisor.handle_event(&event).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Billing period supervisor lagged behind the event bus");
                        }
                        Err(RecvError::Closed) => {
                            info!("Event bus closed, billing period supervisor stopping");
                            break;
                        }
                    },
                }
            }
        })
    }

    /// Stops the event loop; running periods keep their timers
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Applies one bill event
    pub async fn handle_event(&self, event: &BillEvent) {
        let result = match event.event_type {
            BillEventType::Created => self
                .start_period(event.bill_id, event.currency)
                .await
                .map(|_| ()),
            BillEventType::LineItemAdded => match event.amount {
                Some(amount) => {
                    self.signal(
                        &event.bill_id,
                        BillingPeriodSignal::AddLineItem {
                            amount,
                            currency: event.currency,
                        },
                    )
                    .await
                }
                None => {
                    warn!(bill_id = %event.bill_id, "Line item event without an amount");
                    return;
                }
            },
            BillEventType::Closed => self.close_period(&event.bill_id).await,
        };

        match result {
            Ok(()) => {}
            Err(e @ (WorkflowError::NotFound(_) | WorkflowError::Stopped(_))) => {
                debug!(bill_id = %event.bill_id, error = %e, "Bill event not applied to a billing period");
            }
            Err(e) => {
                warn!(bill_id = %event.bill_id, error = %e, "Failed to apply bill event");
            }
        }
    }

    /// Starts a period for a bill using the configured length
    pub async fn start_period(
        &self,
        bill_id: BillId,
        currency: Currency,
    ) -> Result<String, WorkflowError> {
        self.start_period_with(
            BillingPeriodInput::new(bill_id, currency).with_period_days(self.billing_period_days),
        )
        .await
    }

    /// Starts a period from explicit input
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if the bill already has a period, `PeriodTooLong`
    /// for periods over a year
    pub async fn start_period_with(
        &self,
        input: BillingPeriodInput,
    ) -> Result<String, WorkflowError> {
        let mut periods = self.periods.write().await;
        if periods.contains_key(&input.bill_id) {
            return Err(WorkflowError::AlreadyRunning(input.bill_id.to_string()));
        }

        let bill_id = input.bill_id;
        let handle = BillingPeriodHandle::spawn(input)?;
        let workflow_id = handle.workflow_id().to_string();
        periods.insert(bill_id, handle);

        Ok(workflow_id)
    }

    pub async fn signal(
        &self,
        bill_id: &BillId,
        signal: BillingPeriodSignal,
    ) -> Result<(), WorkflowError> {
        self.handle(bill_id).await?.signal(signal)
    }

    /// Closes a bill's period ahead of its timer
    pub async fn close_period(&self, bill_id: &BillId) -> Result<(), WorkflowError> {
        self.signal(bill_id, BillingPeriodSignal::Close).await
    }

    pub async fn period_state(&self, bill_id: &BillId) -> Result<BillingPeriodState, WorkflowError> {
        Ok(self.handle(bill_id).await?.state())
    }

    /// Periods that are still open, oldest first
    pub async fn active_periods(&self) -> Vec<BillingPeriodState> {
        let periods = self.periods.read().await;
        let mut active: Vec<_> = periods
            .values()
            .map(BillingPeriodHandle::state)
            .filter(BillingPeriodState::is_open)
            .collect();
        active.sort_by_key(|s| s.started_at);
        active
    }

    pub async fn handle(&self, bill_id: &BillId) -> Result<BillingPeriodHandle, WorkflowError> {
        self.periods
            .read()
            .await
            .get(bill_id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(bill_id.to_string()))
    }
}

impl std::fmt::Debug for BillingPeriodSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingPeriodSupervisor")
            .field("billing_period_days", &self.billing_period_days)
            .finish_non_exhaustive()
    }
}
