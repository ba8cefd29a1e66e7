//! Core Kernel - Foundational types for the fees ledger
//!
//! This crate provides the building blocks shared by every other crate:
//! - Supported currencies and the static conversion table
//! - Strongly-typed identifiers for bills and line items
//! - The in-process event bus used to decouple lifecycle observers

pub mod currency;
pub mod identifiers;
pub mod events;

pub use currency::{Currency, CurrencyError, convert, convert_to_usd};
pub use identifiers::{BillId, LineItemId};
pub use events::{EventBus, EventBusError, InMemoryEventBus};
