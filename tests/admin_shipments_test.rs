mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, event, response_json, shipment_body, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn created_shipment_is_priced_and_numbered() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(Some(app.client_id))).await;

    let tracking_number = shipment["tracking_number"].as_str().unwrap();
    assert!(tracking_number.starts_with("CL"));
    assert_eq!(shipment["status"], "pending");
    assert_eq!(shipment["created_by"], app.admin_id.to_string());
    assert_eq!(shipment["package_type"], "box");
    assert_eq!(decimal(&shipment["costs"]["total_cost"]), dec!(24.30));
    assert_eq!(shipment["recipient"]["city"], "Arlington");
}

#[tokio::test]
async fn shipment_cannot_start_delivered() {
    let app = TestApp::new().await;
    let mut body = shipment_body(None);
    body["initial_status"] = json!("delivered");

    let response = app
        .admin(Method::POST, "/api/v1/admin/shipments", Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn shipment_for_unknown_customer_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .admin(
            Method::POST,
            "/api/v1/admin/shipments",
            Some(shipment_body(Some(uuid::Uuid::new_v4()))),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_filters_by_status_and_search() {
    let app = TestApp::new().await;
    let moving = app.create_shipment(shipment_body(None)).await;
    let mut other = shipment_body(None);
    other["recipient"]["name"] = json!("Linus Pauling");
    app.create_shipment(other).await;

    app.append_event(moving["id"].as_str().unwrap(), event("picked_up"))
        .await;

    let picked = response_json(
        app.admin(Method::GET, "/api/v1/admin/shipments?status=picked_up", None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(picked["total"], 1);
    assert_eq!(picked["items"][0]["id"], moving["id"]);

    let by_name = response_json(
        app.admin(Method::GET, "/api/v1/admin/shipments?search=Pauling", None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(by_name["total"], 1);
    assert_eq!(by_name["items"][0]["recipient"]["name"], "Linus Pauling");

    let paged = response_json(
        app.admin(Method::GET, "/api/v1/admin/shipments?page=2&limit=1", None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(paged["total"], 2);
    assert_eq!(paged["total_pages"], 2);
    assert_eq!(paged["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn editing_a_cost_line_recomputes_the_total() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();

    let response = app
        .admin(
            Method::PUT,
            &format!("/api/v1/admin/shipments/{}", id),
            Some(json!({ "signature_cost": "3.50", "recipient_city": "Alexandria" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await["data"].clone();

    assert_eq!(updated["recipient"]["city"], "Alexandria");
    assert_eq!(decimal(&updated["costs"]["total_cost"]), dec!(27.80));
    // editing never touches the event log
    assert_eq!(updated["status"], "pending");
}

#[tokio::test]
async fn delete_removes_the_shipment_and_its_history() {
    let app = TestApp::new().await;
    app.add_payment_option("paypal").await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();
    let tracking_number = shipment["tracking_number"].as_str().unwrap();

    app.append_event(id, event("picked_up")).await;
    app.append_event(
        id,
        json!({
            "event_type": "exception",
            "description": "Address unreadable",
            "payment": { "amount": "4.00", "payment_methods": ["paypal"] }
        }),
    )
    .await;
    let proof = app
        .guest(
            Method::POST,
            &format!("/api/v1/track/{}/payment-proofs", tracking_number),
            Some(json!({
                "payer_email": "payer@example.com",
                "payment_method": "paypal",
                "reference": "PP-1"
            })),
        )
        .await;
    assert_eq!(proof.status(), StatusCode::CREATED);

    let response = app
        .admin(Method::DELETE, &format!("/api/v1/admin/shipments/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Shipment deleted with 2 tracking events");
    let deleted = body["data"].clone();
    assert_eq!(deleted["events_removed"], 2);

    let gone = app
        .admin(Method::GET, &format!("/api/v1/admin/shipments/{}", id), None)
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let tracker = app
        .guest(Method::GET, &format!("/api/v1/track/{}", tracking_number), None)
        .await;
    assert_eq!(tracker.status(), StatusCode::NOT_FOUND);

    let proofs = response_json(
        app.admin(Method::GET, "/api/v1/admin/payment-proofs", None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(proofs["total"], 0);

    let again = app
        .admin(Method::DELETE, &format!("/api/v1/admin/shipments/{}", id), None)
        .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn analytics_summarises_the_back_office() {
    let app = TestApp::new().await;

    let delivered = app.create_shipment(shipment_body(None)).await;
    let cancelled = app.create_shipment(shipment_body(None)).await;
    app.create_shipment(shipment_body(None)).await;

    for step in ["picked_up", "delivered"] {
        app.append_event(delivered["id"].as_str().unwrap(), event(step))
            .await;
    }
    let cancel = app
        .append_event(
            cancelled["id"].as_str().unwrap(),
            json!({ "event_type": "cancelled", "description": "Customer request" }),
        )
        .await;
    assert_eq!(cancel.status(), StatusCode::CREATED);

    let response = app
        .admin(Method::GET, "/api/v1/admin/analytics/summary", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = response_json(response).await["data"].clone();

    assert_eq!(summary["total_shipments"], 3);
    assert_eq!(summary["shipments_by_status"]["delivered"], 1);
    assert_eq!(summary["shipments_by_status"]["cancelled"], 1);
    assert_eq!(summary["shipments_by_status"]["pending"], 1);
    assert_eq!(summary["shipments_by_status"]["in_transit"], 0);
    assert_eq!(summary["active_shipments"], 1);
    // the cancelled shipment earns nothing
    assert_eq!(decimal(&summary["revenue"]), dec!(48.60));
    assert_eq!(summary["total_clients"], 1);
    assert_eq!(summary["pending_payment_proofs"], 0);
}

#[tokio::test]
async fn admin_can_list_and_edit_profiles() {
    let app = TestApp::new().await;

    let listed = response_json(
        app.admin(Method::GET, "/api/v1/admin/profiles?user_type=client", None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["id"], app.client_id.to_string());

    let response = app
        .admin(
            Method::PUT,
            &format!("/api/v1/admin/profiles/{}", app.client_id),
            Some(json!({ "company_name": "Hopper Freight" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await["data"].clone();
    assert_eq!(updated["company_name"], "Hopper Freight");
    assert_eq!(updated["user_type"], "client");
}

#[tokio::test]
async fn cost_lines_beyond_the_limit_are_rejected() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();

    let response = app
        .admin(
            Method::PUT,
            &format!("/api/v1/admin/shipments/{}", id),
            Some(json!({ "base_cost": "70000000000000000000000000000" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
