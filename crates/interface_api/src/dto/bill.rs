//! Bill DTOs
//!
//! Bills are returned in their own wire shape (see `domain_billing::Bill`);
//! these types only wrap them into envelopes.

use serde::{Deserialize, Serialize};

use domain_billing::Bill;

#[derive(Debug, Default, Deserialize)]
pub struct CreateBillRequest {
    /// Settlement currency; absent or empty means USD
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddLineItemRequest {
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBillsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillResponse {
    pub bill: Bill,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillListResponse {
    pub bills: Vec<Bill>,
}
