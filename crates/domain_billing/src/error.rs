//! Billing domain errors

use core_kernel::CurrencyError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur in the billing domain
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BillingError {
    /// Currency code outside the supported set
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Bill id is unknown (or could not be parsed)
    #[error("Bill not found: {0}")]
    BillNotFound(String),

    /// Mutation attempted on a closed bill
    #[error("Cannot modify closed bill: {0}")]
    BillClosed(String),

    /// Line item would leave the total infinite or NaN
    #[error("Invalid line item amount: {0}")]
    InvalidAmount(String),

    /// Storage failure other than a missing bill
    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl From<CurrencyError> for BillingError {
    fn from(err: CurrencyError) -> Self {
        match err {
            CurrencyError::Unsupported(code) => BillingError::UnsupportedCurrency(code),
        }
    }
}

impl From<StoreError> for BillingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => BillingError::BillNotFound(id),
            other => BillingError::Store(other),
        }
    }
}
