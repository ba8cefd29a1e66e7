//! Bill handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};

use domain_billing::parse_bill_id;
use workflow_billing_period::BillingPeriodState;

use crate::dto::bill::*;
use crate::{error::ApiError, AppState};

/// Opens a new bill
///
/// The body is optional; a request without a JSON body is settled in USD.
pub async fn create_bill(
    State(state): State<AppState>,
    request: Result<Json<CreateBillRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BillResponse>), ApiError> {
    let request = match request {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => CreateBillRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let bill = state.billing.create_bill(request.currency.as_deref())?;
    Ok((StatusCode::CREATED, Json(BillResponse { bill })))
}

/// Adds a line item to an open bill
pub async fn add_line_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Result<Json<AddLineItemRequest>, JsonRejection>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill_id = parse_bill_id(&id)?;
    let Json(request) = request?;
    let bill = state.billing.add_line_item(
        &bill_id,
        request.description,
        request.amount,
        &request.currency,
    )?;
    Ok(Json(BillResponse { bill }))
}

/// Closes a bill
pub async fn close_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill_id = parse_bill_id(&id)?;
    let bill = state.billing.close_bill(&bill_id)?;
    Ok(Json(BillResponse { bill }))
}

/// Gets a bill by ID
pub async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill_id = parse_bill_id(&id)?;
    let bill = state.billing.get_bill(&bill_id)?;
    Ok(Json(BillResponse { bill }))
}

/// Lists bills, optionally filtered by `?status=open|closed`
pub async fn list_bills(
    State(state): State<AppState>,
    Query(query): Query<ListBillsQuery>,
) -> Result<Json<BillListResponse>, ApiError> {
    let bills = state.billing.list_bills(query.status.as_deref())?;
    Ok(Json(BillListResponse { bills }))
}

/// Gets the billing period mirrored for a bill
pub async fn get_billing_period(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BillingPeriodState>, ApiError> {
    let bill_id = parse_bill_id(&id)?;
    // Unknown bills report bill_not_found rather than period_not_found
    state.billing.get_bill(&bill_id)?;
    let period = state.periods.period_state(&bill_id).await?;
    Ok(Json(period))
}
