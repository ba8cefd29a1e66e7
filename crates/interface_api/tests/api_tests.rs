//! HTTP API tests
//!
//! Requests go straight through the router with `tower::ServiceExt::oneshot`;
//! no socket is bound.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use interface_api::{config::ApiConfig, create_router, dto::bill::BillResponse, AppState};
use test_utils::*;

struct TestApp {
    router: Router,
}

impl TestApp {
    /// Builds the app and starts its billing-period supervisor
    ///
    /// Must be called from inside a tokio runtime.
    fn spawn() -> Self {
        let state = AppState::new(ApiConfig::default()).unwrap();
        state.periods.spawn();
        Self {
            router: create_router(state),
        }
    }

    async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_bill(&self, currency: Option<&str>) -> Value {
        let body = currency.map(|c| json!({ "currency": c }));
        let (status, body) = self.request("POST", "/api/v1/bills", body).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["bill"].clone()
    }

    async fn add_line_item(&self, id: &str, amount: f64, currency: &str) -> (StatusCode, Value) {
        self.request(
            "POST",
            &format!("/api/v1/bills/{id}/line-items"),
            Some(json!({
                "description": StringFixtures::line_item_description(),
                "amount": amount,
                "currency": currency,
            })),
        )
        .await
    }

    /// Polls the billing period until `done` accepts it
    ///
    /// The period is fed asynchronously from the event bus.
    async fn period_eventually(&self, id: &str, done: impl Fn(&Value) -> bool) -> Value {
        let uri = format!("/api/v1/bills/{id}/period");
        for _ in 0..50 {
            let (status, body) = self.request("GET", &uri, None).await;
            if status == StatusCode::OK && done(&body) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("billing period for {id} did not reach the expected state");
    }
}

fn id_of(bill: &Value) -> String {
    bill["id"].as_str().unwrap().to_string()
}

// ============================================================================
// Health Tests
// ============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_bill_count() {
        let app = TestApp::spawn();

        let (status, body) = app.request("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["bills"], 0);

        app.create_bill(None).await;
        let (_, body) = app.request("GET", "/health", None).await;
        assert_eq!(body["bills"], 1);
    }
}

// ============================================================================
// Create Tests
// ============================================================================

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_without_body_defaults_to_usd() {
        let app = TestApp::spawn();
        let bill = app.create_bill(None).await;

        assert_eq!(bill["currency"], "USD");
        assert_eq!(bill["status"], "open");
        assert_eq!(bill["totalAmount"], 0.0);
        assert_eq!(bill["totalAmountDisplay"], "0.00 USD");
        assert_eq!(bill["lineItems"], json!([]));
        assert!(bill.get("closedAt").is_none());
    }

    #[tokio::test]
    async fn test_create_with_currency() {
        let app = TestApp::spawn();
        assert_eq!(app.create_bill(Some("GEL")).await["currency"], "GEL");
        assert_eq!(app.create_bill(Some("")).await["currency"], "USD");
    }

    #[tokio::test]
    async fn test_create_with_unsupported_currency() {
        let app = TestApp::spawn();
        let (status, body) = app
            .request(
                "POST",
                "/api/v1/bills",
                Some(json!({ "currency": StringFixtures::unsupported_currency() })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unsupported_currency");
        assert_eq!(body["message"], "Unsupported currency: EUR");
    }

    #[tokio::test]
    async fn test_create_with_malformed_json() {
        let app = TestApp::spawn();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/bills")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

// ============================================================================
// Line Item Tests
// ============================================================================

mod line_item_tests {
    use super::*;

    #[tokio::test]
    async fn test_gel_line_item_on_usd_bill() {
        let app = TestApp::spawn();
        let id = id_of(&app.create_bill(Some("USD")).await);

        let (status, body) = app.add_line_item(&id, AmountFixtures::gel_fee(), "GEL").await;

        assert_eq!(status, StatusCode::OK);
        let bill = &body["bill"];
        assert_amount_approx_eq(
            bill["totalAmount"].as_f64().unwrap(),
            AmountFixtures::gel_fee_in_usd(),
            AmountFixtures::tolerance(),
        );
        assert_eq!(bill["totalAmountDisplay"], "37.00 USD");
        assert_eq!(bill["lineItems"][0]["amount"], 100.0);
        assert_eq!(bill["lineItems"][0]["currency"], "GEL");
    }

    #[tokio::test]
    async fn test_usd_line_item_on_gel_bill() {
        let app = TestApp::spawn();
        let id = id_of(&app.create_bill(Some("GEL")).await);

        let (_, body) = app
            .add_line_item(&id, AmountFixtures::usd_worth_100_gel(), "USD")
            .await;

        assert_eq!(body["bill"]["totalAmountDisplay"], "100.00 GEL");
    }

    #[tokio::test]
    async fn test_line_item_on_unknown_bill() {
        let app = TestApp::spawn();
        let unknown = IdFixtures::unknown_bill_id().to_string();

        let (status, body) = app.add_line_item(&unknown, 1.0, "USD").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "bill_not_found");

        let (status, _) = app
            .add_line_item(StringFixtures::malformed_bill_id(), 1.0, "USD")
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_line_item_with_unsupported_currency() {
        let app = TestApp::spawn();
        let id = id_of(&app.create_bill(None).await);

        let (status, body) = app.add_line_item(&id, 1.0, "EUR").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unsupported_currency");

        let (_, body) = app.request("GET", &format!("/api/v1/bills/{id}"), None).await;
        assert_eq!(body["bill"]["lineItems"], json!([]));
    }

    #[tokio::test]
    async fn test_line_item_overflowing_the_total() {
        let app = TestApp::spawn();
        let id = id_of(&app.create_bill(Some("GEL")).await);

        let (status, body) = app.add_line_item(&id, 1e308, "USD").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_amount");

        let (_, body) = app.request("GET", &format!("/api/v1/bills/{id}"), None).await;
        assert_eq!(body["bill"]["totalAmount"], 0.0);
        assert_eq!(body["bill"]["totalAmountDisplay"], "0.00 GEL");
    }

    #[tokio::test]
    async fn test_line_item_missing_amount() {
        let app = TestApp::spawn();
        let id = id_of(&app.create_bill(None).await);

        let (status, body) = app
            .request(
                "POST",
                &format!("/api/v1/bills/{id}/line-items"),
                Some(json!({ "description": "x", "currency": "USD" })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }
}

// ============================================================================
// Close Tests
// ============================================================================

mod close_tests {
    use super::*;

    #[tokio::test]
    async fn test_close_then_reject_changes() {
        let app = TestApp::spawn();
        let id = id_of(&app.create_bill(None).await);
        app.add_line_item(&id, AmountFixtures::usd_fee(), "USD").await;

        let (status, body) = app
            .request("POST", &format!("/api/v1/bills/{id}/close"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bill"]["status"], "closed");
        assert!(body["bill"]["closedAt"].is_string());

        let (status, body) = app
            .request("POST", &format!("/api/v1/bills/{id}/close"), None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "bill_closed");

        let (status, _) = app.add_line_item(&id, 1.0, "USD").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = app.request("GET", &format!("/api/v1/bills/{id}"), None).await;
        let bill: BillResponse = serde_json::from_value(body).unwrap();
        assert_bill_closed(&bill.bill);
        assert_total_display(&bill.bill, "10.00 USD");
    }

    #[tokio::test]
    async fn test_close_unknown_bill() {
        let app = TestApp::spawn();
        let unknown = IdFixtures::unknown_bill_id();
        let (status, _) = app
            .request("POST", &format!("/api/v1/bills/{unknown}/close"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Query Tests
// ============================================================================

mod query_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_bill() {
        let app = TestApp::spawn();
        let created = app.create_bill(Some("GEL")).await;
        let id = id_of(&created);

        let (status, body) = app.request("GET", &format!("/api/v1/bills/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bill"], created);

        let bill: BillResponse = serde_json::from_value(body).unwrap();
        assert_bill_open(&bill.bill);
    }

    #[tokio::test]
    async fn test_get_unknown_bill() {
        let app = TestApp::spawn();
        let unknown = IdFixtures::unknown_bill_id();
        let (status, body) = app
            .request("GET", &format!("/api/v1/bills/{unknown}"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "bill_not_found");
    }

    #[tokio::test]
    async fn test_list_bills_by_status() {
        let app = TestApp::spawn();
        let first = id_of(&app.create_bill(None).await);
        app.create_bill(None).await;
        app.create_bill(Some("GEL")).await;
        app.request("POST", &format!("/api/v1/bills/{first}/close"), None)
            .await;

        let count = |body: &Value| body["bills"].as_array().unwrap().len();

        let (status, all) = app.request("GET", "/api/v1/bills", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(count(&all), 3);

        let (_, open) = app.request("GET", "/api/v1/bills?status=open", None).await;
        let (_, closed) = app.request("GET", "/api/v1/bills?status=closed", None).await;
        assert_eq!(count(&open), 2);
        assert_eq!(count(&closed), 1);
        assert_eq!(closed["bills"][0]["id"], first.as_str());

        let (status, bogus) = app.request("GET", "/api/v1/bills?status=bogus", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(count(&bogus), 0);

        let (_, empty) = app.request("GET", "/api/v1/bills?status=", None).await;
        assert_eq!(count(&empty), 3);
    }
}

// ============================================================================
// Billing Period Tests
// ============================================================================

mod period_tests {
    use super::*;

    #[tokio::test]
    async fn test_period_mirrors_the_bill() {
        let app = TestApp::spawn();
        let id = id_of(&app.create_bill(Some("USD")).await);
        app.add_line_item(&id, AmountFixtures::usd_fee(), "USD").await;
        app.add_line_item(&id, AmountFixtures::gel_fee(), "GEL").await;

        let period = app
            .period_eventually(&id, |p| p["lineItemCount"] == 2)
            .await;

        assert_eq!(period["workflowId"], format!("billing-period-{id}"));
        assert_eq!(period["status"], "open");
        assert_amount_approx_eq(
            period["totalAmount"].as_f64().unwrap(),
            AmountFixtures::usd_fee() + AmountFixtures::gel_fee_in_usd(),
            AmountFixtures::tolerance(),
        );
    }

    #[tokio::test]
    async fn test_closing_the_bill_closes_the_period() {
        let app = TestApp::spawn();
        let id = id_of(&app.create_bill(None).await);
        app.period_eventually(&id, |p| p["status"] == "open").await;

        app.request("POST", &format!("/api/v1/bills/{id}/close"), None)
            .await;

        let period = app
            .period_eventually(&id, |p| p["status"] == "closed")
            .await;
        assert_eq!(period["closedBy"], "signal");
        assert!(period["closedAt"].is_string());
    }

    #[tokio::test]
    async fn test_period_of_unknown_bill() {
        let app = TestApp::spawn();
        let unknown = IdFixtures::unknown_bill_id();
        let (status, body) = app
            .request("GET", &format!("/api/v1/bills/{unknown}/period"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "bill_not_found");
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn http_totals_match_recomputation(
            currency in currency_code_strategy(),
            items in line_items_strategy(10),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let bill = runtime.block_on(async {
                let app = TestApp::spawn();
                let id = id_of(&app.create_bill(Some(currency)).await);
                for (_, amount, item_currency) in &items {
                    let (status, _) = app.add_line_item(&id, *amount, item_currency.code()).await;
                    assert_eq!(status, StatusCode::OK);
                }
                let (_, body) = app.request("GET", &format!("/api/v1/bills/{id}"), None).await;
                serde_json::from_value::<BillResponse>(body).unwrap().bill
            });

            prop_assert_eq!(bill.line_items().len(), items.len());
            assert_total_consistent(&bill);
        }
    }
}
