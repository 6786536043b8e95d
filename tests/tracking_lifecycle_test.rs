mod common;

use axum::http::{Method, StatusCode};
use common::{event, response_json, shipment_body, TestApp};
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn new_shipment_has_no_history_and_no_progress() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let tracking_number = shipment["tracking_number"].as_str().unwrap();

    let response = app
        .guest(Method::GET, &format!("/api/v1/track/{}", tracking_number), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let tracker = response_json(response).await["data"].clone();

    assert_eq!(tracker["current_status"], "pending");
    assert!(tracker["progress"].is_null());
    assert!(tracker["latest_event"].is_null());
    assert_eq!(tracker["events"].as_array().unwrap().len(), 0);
    assert_eq!(tracker["progress_steps"].as_array().unwrap().len(), 5);
    assert!(tracker["payment"].is_null());
}

#[tokio::test]
async fn appended_events_drive_status_and_progress() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();
    let tracking_number = shipment["tracking_number"].as_str().unwrap();

    let first = app.append_event(id, event("picked_up")).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(response_json(first).await["data"]["sequence"], 1);

    let second = app.append_event(id, event("in_transit")).await;
    assert_eq!(second.status(), StatusCode::CREATED);

    // lookup trims surrounding whitespace
    let response = app
        .guest(
            Method::GET,
            &format!("/api/v1/track/%20{}%20", tracking_number),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let tracker = response_json(response).await["data"].clone();

    let events = tracker["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event_type"], "picked_up");
    assert_eq!(events[1]["event_type"], "in_transit");
    assert_eq!(tracker["latest_event"]["sequence"], 2);
    assert_eq!(tracker["current_status"], "in_transit");
    assert_eq!(tracker["progress"], 1);

    // the admin view sees the same history and the refreshed status cache
    let detail = response_json(
        app.admin(Method::GET, &format!("/api/v1/admin/shipments/{}", id), None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(detail["current_status"], "in_transit");
    assert_eq!(detail["shipment"]["status"], "in_transit");
    assert_eq!(detail["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn delivered_shipments_accept_no_further_events() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();

    for step in ["picked_up", "in_transit", "out_for_delivery", "delivered"] {
        assert_eq!(app.append_event(id, event(step)).await.status(), StatusCode::CREATED);
    }

    let late = app.append_event(id, event("in_transit")).await;
    assert_eq!(late.status(), StatusCode::CONFLICT);
    let body = response_json(late).await;
    assert!(body["message"].as_str().unwrap().contains("delivered"));

    let history = response_json(
        app.admin(
            Method::GET,
            &format!("/api/v1/admin/shipments/{}/events", id),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(history["data"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn backward_moves_are_conflicts() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();

    app.append_event(id, event("out_for_delivery")).await;
    let response = app.append_event(id, event("picked_up")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn permissive_lifecycle_accepts_any_order() {
    let app = TestApp::with_config(|cfg| cfg.lifecycle.enforce_transitions = false).await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();

    app.append_event(id, event("delivered")).await;
    let response = app.append_event(id, event("in_transit")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn exception_requires_a_description() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();

    let response = app.append_event(id, event("exception")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payment_on_an_ordinary_event_is_rejected_before_writing() {
    let app = TestApp::new().await;
    app.add_payment_option("zelle").await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();

    let response = app
        .append_event(
            id,
            json!({
                "event_type": "in_transit",
                "payment": { "amount": "10.00", "payment_methods": ["zelle"] }
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let history = response_json(
        app.admin(
            Method::GET,
            &format!("/api/v1/admin/shipments/{}/events", id),
            None,
        )
        .await,
    )
    .await;
    assert!(history["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn exception_with_payment_exposes_resolution_on_the_tracker() {
    let app = TestApp::new().await;
    app.add_payment_option("bank_transfer").await;
    app.add_payment_option("paypal").await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();
    let tracking_number = shipment["tracking_number"].as_str().unwrap();

    app.append_event(id, event("picked_up")).await;

    let unknown_method = app
        .append_event(
            id,
            json!({
                "event_type": "exception",
                "description": "Customs duty outstanding",
                "payment": { "amount": "25.00", "payment_methods": ["venmo"] }
            }),
        )
        .await;
    assert_eq!(unknown_method.status(), StatusCode::BAD_REQUEST);

    let held = app
        .append_event(
            id,
            json!({
                "event_type": "exception",
                "description": "Customs duty outstanding",
                "location": "Port of Newark",
                "payment": { "amount": "25.00", "payment_methods": ["bank_transfer"] }
            }),
        )
        .await;
    assert_eq!(held.status(), StatusCode::CREATED);
    let held = response_json(held).await["data"].clone();
    assert_eq!(held["payment"]["payment_methods"], json!(["bank_transfer"]));

    let tracker = response_json(
        app.guest(Method::GET, &format!("/api/v1/track/{}", tracking_number), None)
            .await,
    )
    .await["data"]
        .clone();

    assert_eq!(tracker["current_status"], "exception");
    let payment = &tracker["payment"];
    assert_eq!(payment["event_id"], held["id"]);
    assert_eq!(common::decimal(&payment["amount"]), "25.00".parse().unwrap());
    assert_eq!(payment["can_make_payment"], true);
    assert_eq!(payment["payment_methods"], json!(["bank_transfer"]));
    // the whole active catalog is offered
    let options = payment["options"].as_array().unwrap();
    assert_eq!(options.len(), 2);
    assert!(options.iter().any(|o| o["method_type"] == "paypal"));

    // resuming clears the payment panel
    app.append_event(id, event("in_transit")).await;
    let tracker = response_json(
        app.guest(Method::GET, &format!("/api/v1/track/{}", tracking_number), None)
            .await,
    )
    .await["data"]
        .clone();
    assert!(tracker["payment"].is_null());
}

#[tokio::test]
async fn unknown_tracking_number_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .guest(Method::GET, "/api/v1/track/CL000000NOPE", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let stream = app
        .guest(Method::GET, "/api/v1/track/CL000000NOPE/events/stream", None)
        .await;
    assert_eq!(stream.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn live_feed_delivers_appended_events() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap().to_string();
    let tracking_number = shipment["tracking_number"].as_str().unwrap();

    let response = app
        .guest(
            Method::GET,
            &format!("/api/v1/track/{}/events/stream", tracking_number),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    assert_eq!(app.append_event(&id, event("picked_up")).await.status(), StatusCode::CREATED);

    let mut body = response.into_body().into_data_stream();
    let mut received = String::new();
    while !received.contains("\n\n") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .expect("no event within five seconds")
            .expect("stream ended early")
            .expect("body chunk");
        received.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(received.contains("event: tracking_event"));
    assert!(received.contains("id: 1"));
    assert!(received.contains("\"event_type\":\"picked_up\""));
}

#[tokio::test]
async fn deleting_a_shipment_ends_its_live_feed() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap().to_string();
    let tracking_number = shipment["tracking_number"].as_str().unwrap();

    let response = app
        .guest(
            Method::GET,
            &format!("/api/v1/track/{}/events/stream", tracking_number),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.state.feed.active_channels(), 1);

    let deleted = app
        .admin(Method::DELETE, &format!("/api/v1/admin/shipments/{}", id), None)
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(app.state.feed.active_channels(), 0);

    let mut body = response.into_body().into_data_stream();
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        while body.next().await.is_some() {}
    })
    .await;
    assert!(ended.is_ok(), "stream stayed open after the shipment was deleted");
}

#[tokio::test]
async fn closing_the_live_feed_releases_its_channel() {
    let app = TestApp::new().await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let tracking_number = shipment["tracking_number"].as_str().unwrap();

    let response = app
        .guest(
            Method::GET,
            &format!("/api/v1/track/{}/events/stream", tracking_number),
            None,
        )
        .await;
    assert_eq!(app.state.feed.active_channels(), 1);

    drop(response);
    assert_eq!(app.state.feed.active_channels(), 0);
}

#[tokio::test]
async fn exception_without_an_active_catalog_cannot_be_paid() {
    let app = TestApp::new().await;
    let option = app.add_payment_option("zelle").await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();
    let tracking_number = shipment["tracking_number"].as_str().unwrap();

    app.append_event(id, event("picked_up")).await;
    let held = app
        .append_event(
            id,
            json!({
                "event_type": "exception",
                "description": "Storage fee due",
                "payment": { "amount": "12.00", "payment_methods": ["zelle"] }
            }),
        )
        .await;
    assert_eq!(held.status(), StatusCode::CREATED);

    // the only requested method leaves the catalog after the hold
    let removed = app
        .admin(
            Method::DELETE,
            &format!(
                "/api/v1/admin/payment-options/{}",
                option["id"].as_str().unwrap()
            ),
            None,
        )
        .await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let tracker = response_json(
        app.guest(Method::GET, &format!("/api/v1/track/{}", tracking_number), None)
            .await,
    )
    .await["data"]
        .clone();

    assert_eq!(tracker["current_status"], "exception");
    let payment = &tracker["payment"];
    assert_eq!(payment["payment_methods"], json!(["zelle"]));
    assert_eq!(payment["can_make_payment"], false);
    assert!(payment["options"].as_array().unwrap().is_empty());

    // and a proof has nothing to pay with
    let proof = app
        .guest(
            Method::POST,
            &format!("/api/v1/track/{}/payment-proofs", tracking_number),
            Some(json!({
                "payer_email": "payer@example.com",
                "payment_method": "zelle",
                "reference": "Z-1"
            })),
        )
        .await;
    assert_eq!(proof.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreadable_payment_methods_are_a_server_error() {
    use cargolink_api::models::tracking_event_payment;
    use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};

    let app = TestApp::new().await;
    app.add_payment_option("paypal").await;
    let shipment = app.create_shipment(shipment_body(None)).await;
    let id = shipment["id"].as_str().unwrap();
    let tracking_number = shipment["tracking_number"].as_str().unwrap();
    app.append_event(
        id,
        json!({
            "event_type": "exception",
            "description": "Address unreadable",
            "payment": { "amount": "4.00", "payment_methods": ["paypal"] }
        }),
    )
    .await;

    let stored = tracking_event_payment::Entity::find()
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut corrupted = stored.into_active_model();
    corrupted.payment_methods = Set("paypal;zelle".to_string());
    corrupted.update(app.state.db.as_ref()).await.unwrap();

    let response = app
        .guest(Method::GET, &format!("/api/v1/track/{}", tracking_number), None)
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert!(!body["message"].as_str().unwrap().contains("zelle"));
}
