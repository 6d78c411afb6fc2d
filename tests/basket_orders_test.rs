//! Basket editing, checkout and order history.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, ADMIN_EMAIL};
use serde_json::{json, Value};

async fn basket(app: &TestApp, token: &str) -> Value {
    let response = app
        .request(Method::GET, "/api/v1/basket", None, Some(token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await
}

async fn add(app: &TestApp, token: &str, items: Value) -> axum::response::Response {
    app.request(
        Method::POST,
        "/api/v1/basket",
        Some(json!({ "items": items })),
        Some(token),
    )
    .await
}

#[tokio::test]
async fn quantities_replace_rather_than_accumulate() {
    let app = TestApp::new().await;
    app.seeded_shop().await;
    let widget = app.offer_id("Widget").await;
    let buyer = app.active_user("buyer@example.com", "buyer").await;

    let fresh = basket(&app, &buyer).await;
    assert_eq!(fresh["state"], "basket");
    assert!(fresh["ordered_items"].as_array().unwrap().is_empty());
    assert_eq!(fresh["total_sum"], 0);
    // viewing again returns the same basket
    assert_eq!(basket(&app, &buyer).await["id"], fresh["id"]);

    let response = add(&app, &buyer, json!([{ "product_info": widget, "quantity": 3 }])).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["Status"], true);
    assert_eq!(body["updated"], 1);

    add(&app, &buyer, json!([{ "product_info": widget, "quantity": 1 }])).await;

    let current = basket(&app, &buyer).await;
    assert_eq!(current["id"], fresh["id"]);
    let lines = current["ordered_items"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 1);
    assert_eq!(current["state"], "basket");
    assert_eq!(current["total_sum"], 100);
}

#[tokio::test]
async fn unknown_offer_rolls_back_the_whole_call() {
    let app = TestApp::new().await;
    app.seeded_shop().await;
    let widget = app.offer_id("Widget").await;
    let buyer = app.active_user("buyer@example.com", "buyer").await;

    let response = add(
        &app,
        &buyer,
        json!([
            { "product_info": widget, "quantity": 2 },
            { "product_info": 9999, "quantity": 1 }
        ]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let current = basket(&app, &buyer).await;
    assert!(current["ordered_items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn entries_without_id_are_skipped_and_zero_removes() {
    let app = TestApp::new().await;
    app.seeded_shop().await;
    let widget = app.offer_id("Widget").await;
    let gadget = app.offer_id("Gizmo Gadget").await;
    let buyer = app.active_user("buyer@example.com", "buyer").await;

    let response = add(
        &app,
        &buyer,
        json!([
            { "product_info": widget },
            { "quantity": 4 },
            { "product_info": gadget, "quantity": 2 }
        ]),
    )
    .await;
    assert_eq!(response_json(response).await["updated"], 2);

    let response = add(&app, &buyer, json!([{ "product_info": widget, "quantity": 0 }])).await;
    assert_eq!(response_json(response).await["removed"], 1);

    let current = basket(&app, &buyer).await;
    let lines = current["ordered_items"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["product_info"]["id"], gadget);

    let negative = add(&app, &buyer, json!([{ "product_info": gadget, "quantity": -1 }])).await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let empty = add(&app, &buyer, json!([])).await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_accepts_list_or_comma_separated_ids() {
    let app = TestApp::new().await;
    app.seeded_shop().await;
    let widget = app.offer_id("Widget").await;
    let gadget = app.offer_id("Gizmo Gadget").await;
    let buyer = app.active_user("buyer@example.com", "buyer").await;

    let missing = app
        .request(
            Method::DELETE,
            "/api/v1/basket",
            Some(json!({ "items": [widget] })),
            Some(&buyer),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    add(
        &app,
        &buyer,
        json!([
            { "product_info": widget, "quantity": 1 },
            { "product_info": gadget, "quantity": 1 }
        ]),
    )
    .await;

    let response = app
        .request(
            Method::DELETE,
            "/api/v1/basket",
            Some(json!({ "items": format!("{widget},{gadget}") })),
            Some(&buyer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["deleted"], 2);
}

#[tokio::test]
async fn delete_accepts_basket_line_objects() {
    let app = TestApp::new().await;
    app.seeded_shop().await;
    let widget = app.offer_id("Widget").await;
    let gadget = app.offer_id("Gizmo Gadget").await;
    let buyer = app.active_user("buyer@example.com", "buyer").await;

    add(
        &app,
        &buyer,
        json!([
            { "product_info": widget, "quantity": 2 },
            { "product_info": gadget, "quantity": 1 }
        ]),
    )
    .await;

    let response = app
        .request(
            Method::DELETE,
            "/api/v1/basket",
            Some(json!({ "items": [{ "product_info": widget }, { "quantity": 5 }] })),
            Some(&buyer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["deleted"], 1);

    let current = basket(&app, &buyer).await;
    let lines = current["ordered_items"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["product_info"]["id"], gadget);
    assert_eq!(current["total_sum"], 250);
}

#[tokio::test]
async fn checkout_places_order_and_notifies_buyer_and_operator() {
    let app = TestApp::new().await;
    app.seeded_shop().await;
    let widget = app.offer_id("Widget").await;
    let gadget = app.offer_id("Gizmo Gadget").await;
    let buyer = app.active_user("buyer@example.com", "buyer").await;
    let contact = app.create_contact(&buyer).await;

    add(
        &app,
        &buyer,
        json!([
            { "product_info": widget, "quantity": 3 },
            { "product_info": gadget, "quantity": 1 }
        ]),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/order/",
            Some(json!({ "contact": contact })),
            Some(&buyer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let order = &body["order"];
    assert_eq!(order["state"], "new");
    assert_eq!(order["total_sum"], 3 * 100 + 250);
    assert_eq!(order["contact"]["id"], contact);

    let buyer_mail = app.notifier.sent_to("buyer@example.com");
    let confirmation = buyer_mail.last().expect("buyer notified");
    assert!(confirmation.body.contains("Widget (Acme) | 3 x 100 = 300"));
    assert!(confirmation.body.contains("Total: 550"));
    let operator_mail = app.notifier.sent_to(ADMIN_EMAIL);
    assert_eq!(operator_mail.len(), 1);

    // the placed basket is replaced by an empty one; the order moves to history
    let after = basket(&app, &buyer).await;
    assert_ne!(after["id"], order["id"]);
    assert!(after["ordered_items"].as_array().unwrap().is_empty());
    let orders = response_json(
        app.request(Method::GET, "/api/v1/order/", None, Some(&buyer))
            .await,
    )
    .await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["total_sum"], 550);

    // a new add starts a fresh basket
    add(&app, &buyer, json!([{ "product_info": widget }])).await;
    let fresh = basket(&app, &buyer).await;
    assert_ne!(fresh["id"], orders[0]["id"]);
    assert_eq!(fresh["ordered_items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn checkout_without_basket_or_items_is_empty_basket() {
    let app = TestApp::new().await;
    app.seeded_shop().await;
    let widget = app.offer_id("Widget").await;
    let buyer = app.active_user("buyer@example.com", "buyer").await;
    let contact = app.create_contact(&buyer).await;

    let checkout = || {
        app.request(
            Method::POST,
            "/api/v1/order/",
            Some(json!({ "contact": contact })),
            Some(&buyer),
        )
    };

    let response = checkout().await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["Errors"], "Basket is empty");

    add(&app, &buyer, json!([{ "product_info": widget, "quantity": 0 }])).await;
    add(&app, &buyer, json!([{ "product_info": widget, "quantity": 1 }])).await;
    app.request(
        Method::DELETE,
        "/api/v1/basket",
        Some(json!({ "items": [widget] })),
        Some(&buyer),
    )
    .await;

    let response = checkout().await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["Errors"], "Basket is empty");
}

#[tokio::test]
async fn checkout_requires_own_contact() {
    let app = TestApp::new().await;
    app.seeded_shop().await;
    let widget = app.offer_id("Widget").await;
    let buyer = app.active_user("buyer@example.com", "buyer").await;
    let stranger = app.active_user("stranger@example.com", "buyer").await;
    let foreign_contact = app.create_contact(&stranger).await;

    add(&app, &buyer, json!([{ "product_info": widget }])).await;

    let foreign = app
        .request(
            Method::POST,
            "/api/v1/order/",
            Some(json!({ "contact": foreign_contact })),
            Some(&buyer),
        )
        .await;
    assert_eq!(foreign.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(foreign).await["Errors"],
        "Contact is required to place an order"
    );

    let missing = app
        .request(Method::POST, "/api/v1/order/", Some(json!({})), Some(&buyer))
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    // still a basket
    assert_eq!(basket(&app, &buyer).await["state"], "basket");
}

#[tokio::test]
async fn mail_failure_after_checkout_keeps_the_order() {
    let app = TestApp::new().await;
    app.seeded_shop().await;
    let widget = app.offer_id("Widget").await;
    let buyer = app.active_user("buyer@example.com", "buyer").await;
    let contact = app.create_contact(&buyer).await;
    add(&app, &buyer, json!([{ "product_info": widget, "quantity": 2 }])).await;

    app.notifier.set_failing(true);
    let response = app
        .request(
            Method::POST,
            "/api/v1/order/",
            Some(json!({ "contact": contact.to_string() })),
            Some(&buyer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    app.notifier.set_failing(false);

    let orders = response_json(
        app.request(Method::GET, "/api/v1/order/", None, Some(&buyer))
            .await,
    )
    .await;
    assert_eq!(orders[0]["state"], "new");
    assert_eq!(orders[0]["total_sum"], 200);
}
