mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration, Utc};
use common::{decimal, response_json, shipment_body, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn parcel() -> (Value, Value) {
    let body = shipment_body(None);
    (body["package"].clone(), body["service"].clone())
}

#[tokio::test]
async fn rate_quote_and_shipment_agree_on_price() {
    let app = TestApp::new().await;
    let (package, service) = parcel();

    let rate = app
        .guest(
            Method::POST,
            "/api/v1/rates/calculate",
            Some(json!({ "package": package, "service": service })),
        )
        .await;
    assert_eq!(rate.status(), StatusCode::OK);
    let rate = response_json(rate).await["data"].clone();

    // 15.00 base + 3 kg at 2.50 + 8% tax
    assert_eq!(decimal(&rate["base_cost"]), dec!(15.00));
    assert_eq!(decimal(&rate["weight_cost"]), dec!(7.50));
    assert_eq!(decimal(&rate["tax_amount"]), dec!(1.80));
    assert_eq!(decimal(&rate["total_cost"]), dec!(24.30));
    assert_eq!(rate["estimated_delivery_days"], 5);

    let quote = app
        .guest(
            Method::POST,
            "/api/v1/quotes",
            Some(json!({
                "origin": { "city": "Rotterdam", "country": "NL" },
                "destination": { "city": "Arlington", "country": "US" },
                "package": package,
                "service": service,
                "contact_email": "Buyer@Example.com"
            })),
        )
        .await;
    assert_eq!(quote.status(), StatusCode::CREATED);
    let quote = response_json(quote).await["data"].clone();

    let shipment = app.create_shipment(shipment_body(None)).await;

    assert_eq!(decimal(&quote["base_cost"]), decimal(&shipment["costs"]["base_cost"]));
    assert_eq!(
        decimal(&quote["estimated_cost"]),
        decimal(&shipment["costs"]["total_cost"])
    );
    assert_eq!(decimal(&quote["estimated_cost"]), decimal(&rate["total_cost"]));
    assert_eq!(quote["estimated_delivery_days"], 5);

    let created: DateTime<Utc> = shipment["created_at"].as_str().unwrap().parse().unwrap();
    let eta: DateTime<Utc> = shipment["estimated_delivery_date"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!((eta - created).num_days(), 5);
}

#[tokio::test]
async fn stored_quote_is_readable_and_expires_in_a_week() {
    let app = TestApp::new().await;
    let (package, service) = parcel();

    let created = response_json(
        app.guest(
            Method::POST,
            "/api/v1/quotes",
            Some(json!({
                "origin": { "city": "Lyon", "country": "FR" },
                "destination": { "city": "Porto", "country": "PT" },
                "package": package,
                "service": service,
                "contact_email": "guest@example.com",
                "contact_name": "Sam"
            })),
        )
        .await,
    )
    .await["data"]
        .clone();

    let fetched = app
        .guest(
            Method::GET,
            &format!("/api/v1/quotes/{}", created["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched = response_json(fetched).await["data"].clone();

    assert_eq!(fetched["status"], "quoted");
    let created_at: DateTime<Utc> = fetched["created_at"].as_str().unwrap().parse().unwrap();
    let expires_at: DateTime<Utc> = fetched["expires_at"].as_str().unwrap().parse().unwrap();
    assert_eq!(expires_at - created_at, Duration::days(7));

    let listed = response_json(
        app.admin(Method::GET, "/api/v1/admin/quotes?search=guest@", None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["contact_name"], "Sam");
}

#[tokio::test]
async fn unpriceable_parcels_are_bad_requests() {
    let app = TestApp::new().await;
    let (mut package, service) = parcel();
    package["weight_kg"] = json!("0");

    let response = app
        .guest(
            Method::POST,
            "/api/v1/rates/calculate",
            Some(json!({ "package": package, "service": service })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .guest(
            Method::POST,
            "/api/v1/quotes",
            Some(json!({
                "origin": { "city": "Lyon", "country": "FR" },
                "destination": { "city": "Porto", "country": "PT" },
                "package": package,
                "service": service,
                "contact_email": "not-an-email"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_quote_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .guest(
            Method::GET,
            &format!("/api/v1/quotes/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_parcels_are_bad_requests() {
    let app = TestApp::new().await;
    let (mut package, service) = parcel();
    for side in ["length_cm", "width_cm", "height_cm"] {
        package[side] = json!("100000000000000");
    }

    let response = app
        .guest(
            Method::POST,
            "/api/v1/rates/calculate",
            Some(json!({ "package": package, "service": service })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .guest(
            Method::POST,
            "/api/v1/quotes",
            Some(json!({
                "origin": { "city": "Lyon", "country": "FR" },
                "destination": { "city": "Porto", "country": "PT" },
                "package": package,
                "service": service,
                "contact_email": "guest@example.com"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (mut heavy, service) = parcel();
    heavy["weight_kg"] = json!("99999999999999999999");
    let response = app
        .guest(
            Method::POST,
            "/api/v1/rates/calculate",
            Some(json!({ "package": heavy, "service": service })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_status_filter_follows_expiry() {
    use cargolink_api::models::quote;
    use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};

    let app = TestApp::new().await;
    let (package, service) = parcel();
    let mut ids = Vec::new();
    for email in ["stale@example.com", "fresh@example.com"] {
        let created = response_json(
            app.guest(
                Method::POST,
                "/api/v1/quotes",
                Some(json!({
                    "origin": { "city": "Lyon", "country": "FR" },
                    "destination": { "city": "Porto", "country": "PT" },
                    "package": package,
                    "service": service,
                    "contact_email": email
                })),
            )
            .await,
        )
        .await["data"]
            .clone();
        ids.push(created["id"].as_str().unwrap().parse::<uuid::Uuid>().unwrap());
    }

    let stale = quote::Entity::find_by_id(ids[0])
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut stale = stale.into_active_model();
    stale.expires_at = Set(Utc::now() - Duration::days(1));
    stale.update(app.state.db.as_ref()).await.unwrap();

    let expired = response_json(
        app.admin(Method::GET, "/api/v1/admin/quotes?status=expired", None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(expired["total"], 1);
    assert_eq!(expired["items"][0]["id"], ids[0].to_string());
    assert_eq!(expired["items"][0]["status"], "expired");

    let open = response_json(
        app.admin(Method::GET, "/api/v1/admin/quotes?status=quoted", None)
            .await,
    )
    .await["data"]
        .clone();
    assert_eq!(open["total"], 1);
    assert_eq!(open["items"][0]["id"], ids[1].to_string());
}
