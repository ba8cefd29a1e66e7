//! A single billing period
//!
//! Each period is one tokio task that races the period timer against its
//! signal channel. Whichever closes the period first wins; the task then
//! publishes the final state and exits.
//!
//! ```text
//!            ┌──────── AddLineItem ───────┐
//!            ▼                            │
//! start ──▶ Open ──── Close signal ───▶ Closed (ClosedBy::Signal)
//!            │
//!            └──── timer elapsed ─────▶ Closed (ClosedBy::PeriodElapsed)
//! ```
//!
//! The period only mirrors the bill. It never writes to the bill store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use core_kernel::{convert, BillId, Currency};
use domain_billing::BillStatus;

use crate::error::WorkflowError;

/// Longest period a workflow may run, in days
pub const MAX_BILLING_PERIOD_DAYS: u32 = 365;

/// Period used when none is configured, in days
pub const DEFAULT_BILLING_PERIOD_DAYS: u32 = 30;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Parameters for starting a billing period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPeriodInput {
    pub bill_id: BillId,
    pub currency: Currency,
    pub billing_period_days: u32,
}

impl BillingPeriodInput {
    pub fn new(bill_id: BillId, currency: Currency) -> Self {
        Self {
            bill_id,
            currency,
            billing_period_days: DEFAULT_BILLING_PERIOD_DAYS,
        }
    }

    pub fn with_period_days(mut self, days: u32) -> Self {
        self.billing_period_days = days;
        self
    }

    pub fn billing_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.billing_period_days) * SECONDS_PER_DAY)
    }

    /// Rejects periods longer than [`MAX_BILLING_PERIOD_DAYS`]
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.billing_period_days > MAX_BILLING_PERIOD_DAYS {
            return Err(WorkflowError::PeriodTooLong {
                days: self.billing_period_days,
                max: MAX_BILLING_PERIOD_DAYS,
            });
        }
        Ok(())
    }
}

/// Workflow id for a bill's billing period
pub fn workflow_id(bill_id: &BillId) -> String {
    format!("billing-period-{}", bill_id)
}

/// What ended a billing period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedBy {
    PeriodElapsed,
    Signal,
}

/// Commands a running period accepts
#[derive(Debug, Clone, PartialEq)]
pub enum BillingPeriodSignal {
    AddLineItem { amount: f64, currency: Currency },
    Close,
}

/// Queryable view of a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPeriodState {
    pub workflow_id: String,
    pub bill_id: BillId,
    pub status: BillStatus,
    pub currency: Currency,
    pub total_amount: f64,
    pub line_item_count: usize,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<ClosedBy>,
}

impl BillingPeriodState {
    fn started(input: &BillingPeriodInput) -> Self {
        Self {
            workflow_id: workflow_id(&input.bill_id),
            bill_id: input.bill_id,
            status: BillStatus::Open,
            currency: input.currency,
            total_amount: 0.0,
            line_item_count: 0,
            started_at: Utc::now(),
            closed_at: None,
            closed_by: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == BillStatus::Open
    }
}

/// Handle to a running (or finished) billing period
///
/// Cloning the handle does not duplicate the workflow.
#[derive(Debug, Clone)]
pub struct BillingPeriodHandle {
    workflow_id: String,
    signals: mpsc::UnboundedSender<BillingPeriodSignal>,
    state: watch::Receiver<BillingPeriodState>,
}

impl BillingPeriodHandle {
    /// Spawns the period task on the current tokio runtime
    ///
    /// # Errors
    ///
    /// `WorkflowError::PeriodTooLong` if the input period exceeds a year
    pub fn spawn(input: BillingPeriodInput) -> Result<Self, WorkflowError> {
        input.validate()?;

        let initial = BillingPeriodState::started(&input);
        let workflow_id = initial.workflow_id.clone();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(initial);

        info!(
            workflow_id = %workflow_id,
            currency = %input.currency,
            days = input.billing_period_days,
            "Billing period started"
        );
        tokio::spawn(run(input, signal_rx, state_tx));

        Ok(Self {
            workflow_id,
            signals: signal_tx,
            state: state_rx,
        })
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Current snapshot of the period
    pub fn state(&self) -> BillingPeriodState {
        self.state.borrow().clone()
    }

    pub fn signal(&self, signal: BillingPeriodSignal) -> Result<(), WorkflowError> {
        self.signals
            .send(signal)
            .map_err(|_| WorkflowError::Stopped(self.workflow_id.clone()))
    }

    pub fn add_line_item(&self, amount: f64, currency: Currency) -> Result<(), WorkflowError> {
        self.signal(BillingPeriodSignal::AddLineItem { amount, currency })
    }

    pub fn close(&self) -> Result<(), WorkflowError> {
        self.signal(BillingPeriodSignal::Close)
    }

    /// Waits until the period has closed and returns its final state
    pub async fn closed(&self) -> BillingPeriodState {
        let mut state = self.state.clone();
        if let Ok(final_state) = state.wait_for(|s| !s.is_open()).await {
            return final_state.clone();
        }
        // The task only drops the sender after publishing the final state
        let last = state.borrow().clone();
        last
    }
}

async fn run(
    input: BillingPeriodInput,
    mut signals: mpsc::UnboundedReceiver<BillingPeriodSignal>,
    state: watch::Sender<BillingPeriodState>,
) {
    let timer = tokio::time::sleep(input.billing_period());
    tokio::pin!(timer);

    let mut signals_open = true;
    let closed_by = loop {
        tokio::select! {
            _ = &mut timer => break ClosedBy::PeriodElapsed,
            signal = signals.recv(), if signals_open => match signal {
                Some(BillingPeriodSignal::AddLineItem { amount, currency }) => {
                    state.send_modify(|s| {
                        s.total_amount += convert(amount, currency, s.currency);
                        s.line_item_count += 1;
                    });
                    debug!(bill_id = %input.bill_id, amount, currency = %currency, "Billing period accrued line item");
                }
                Some(BillingPeriodSignal::Close) => break ClosedBy::Signal,
                // Every handle is gone; only the timer can end the period now
                None => signals_open = false,
            },
        }
    };

    state.send_modify(|s| {
        s.status = BillStatus::Closed;
        s.closed_at = Some(Utc::now());
        s.closed_by = Some(closed_by);
    });

    let last = state.borrow();
    info!(
        workflow_id = %last.workflow_id,
        closed_by = ?closed_by,
        total = %last.currency.format_amount(last.total_amount),
        line_items = last.line_item_count,
        "Billing period closed"
    );
}
