//! HTTP API Layer
//!
//! This crate provides the REST API for the fees ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for bills and health
//! - **Middleware**: Request logging, tracing
//! - **DTOs**: Request/Response envelopes
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(config)?;
//! let supervisor = state.periods.spawn();
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{EventBus, InMemoryEventBus};
use domain_billing::{BillEvent, BillingService, InMemoryBillStore};
use workflow_billing_period::{BillingPeriodSupervisor, WorkflowError};

use crate::config::ApiConfig;
use crate::handlers::{bills, health};
use crate::middleware::request_logging;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub billing: BillingService<InMemoryBillStore>,
    pub periods: BillingPeriodSupervisor,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the store, event bus, billing service and period supervisor
    ///
    /// The supervisor is not started; call `periods.spawn()` from inside a
    /// tokio runtime before serving requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured billing period is out of range
    pub fn new(config: ApiConfig) -> Result<Self, WorkflowError> {
        let bus: Arc<dyn EventBus<BillEvent>> =
            Arc::new(InMemoryEventBus::new(config.event_buffer));
        let periods = BillingPeriodSupervisor::new(bus.clone(), config.billing_period_days)?;
        let billing =
            BillingService::new(Arc::new(InMemoryBillStore::new())).with_event_bus(bus);

        Ok(Self {
            billing,
            periods,
            config,
        })
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new().route("/health", get(health::health_check));

    // Bill routes
    let bill_routes = Router::new()
        .route("/", post(bills::create_bill).get(bills::list_bills))
        .route("/:id", get(bills::get_bill))
        .route("/:id/line-items", post(bills::add_line_item))
        .route("/:id/close", post(bills::close_bill))
        .route("/:id/period", get(bills::get_billing_period));

    let api_routes = Router::new()
        .nest("/bills", bill_routes)
        .layer(axum_middleware::from_fn(request_logging));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
