//! Settlement currencies and the static conversion table
//!
//! The ledger only knows two currencies. Every rate is expressed against USD,
//! which acts as the pivot for conversions in either direction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currencies accepted anywhere in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    GEL,
    USD,
}

/// Errors raised while resolving a currency code
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("unsupported currency: {0}")]
    Unsupported(String),
}

impl Currency {
    /// Currency used when the caller does not name one
    pub const DEFAULT: Currency = Currency::USD;

    /// All supported currencies
    pub const ALL: [Currency; 2] = [Currency::GEL, Currency::USD];

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::GEL => "GEL",
            Currency::USD => "USD",
        }
    }

    /// How many USD one unit of this currency is worth
    pub fn usd_rate(&self) -> f64 {
        match self {
            Currency::GEL => 0.37,
            Currency::USD => 1.0,
        }
    }

    /// Resolves an optional code, falling back to [`Currency::DEFAULT`]
    /// when the code is absent or empty.
    ///
    /// # Errors
    ///
    /// Returns [`CurrencyError::Unsupported`] for any non-empty code outside
    /// the supported set.
    pub fn resolve(code: Option<&str>) -> Result<Self, CurrencyError> {
        match code {
            None | Some("") => Ok(Self::DEFAULT),
            Some(code) => code.parse(),
        }
    }

    /// Formats an amount the way bills display their totals, e.g. `"37.00 USD"`
    pub fn format_amount(&self, amount: f64) -> String {
        format!("{:.2} {}", amount, self.code())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GEL" => Ok(Currency::GEL),
            "USD" => Ok(Currency::USD),
            other => Err(CurrencyError::Unsupported(other.to_string())),
        }
    }
}

/// Converts an amount into USD
pub fn convert_to_usd(amount: f64, from: Currency) -> f64 {
    match from {
        Currency::USD => amount,
        other => amount * other.usd_rate(),
    }
}

/// Converts an amount between any two supported currencies, pivoting on USD
pub fn convert(amount: f64, from: Currency, to: Currency) -> f64 {
    if from == to {
        return amount;
    }
    let usd = convert_to_usd(amount, from);
    match to {
        Currency::USD => usd,
        other => usd / other.usd_rate(),
    }
}
