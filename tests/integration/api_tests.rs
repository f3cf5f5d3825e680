use super::*;
use axum::http::{header, Method, StatusCode};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubConnector::ok(Platform::Ebay, vec![])]).await;

    let response = make_request(&app, Method::GET, "/health").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["connectors"], serde_json::json!(["ebay"]));
    Ok(())
}

#[tokio::test]
async fn test_list_platforms_in_priority_order() -> anyhow::Result<()> {
    let app = create_test_app(vec![
        StubConnector::ok(Platform::Walmart, vec![]),
        StubConnector::ok(Platform::Amazon, vec![]),
        StubConnector::ok(Platform::BestBuy, vec![]),
    ])
    .await;

    let response = make_request(&app, Method::GET, "/api/v1/platforms").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], serde_json::json!(["amazon", "bestbuy", "walmart"]));
    Ok(())
}

#[tokio::test]
async fn test_search_partial_failure() -> anyhow::Result<()> {
    let app = create_test_app(vec![
        StubConnector::ok(Platform::Ebay, vec![product("e1", "19.99"), product("e2", "5")]),
        StubConnector::failing(ConnectorError::rate_limited(Platform::Amazon, "HTTP 429")),
    ])
    .await;

    let response = make_request(&app, Method::GET, "/api/v1/search?q=usb%20cable&sort_by=price").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=300"
    );

    let body = body_json(response).await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["products"][0]["id"], "e2");
    assert_eq!(body["products"][1]["id"], "e1");
    assert_eq!(body["platformResults"]["ebay"]["count"], 2);
    assert_eq!(body["platformResults"]["amazon"]["error"]["kind"], "rate_limited");
    assert!(body.get("error").is_none());
    Ok(())
}

#[tokio::test]
async fn test_search_total_failure_is_bad_gateway() -> anyhow::Result<()> {
    let app = create_test_app(vec![
        StubConnector::failing(ConnectorError::auth(Platform::Ebay, "HTTP 401")),
        StubConnector::failing(ConnectorError::network(Platform::Walmart, "connection refused")),
    ])
    .await;

    let response = make_request(&app, Method::GET, "/api/v1/search?q=monitor").await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");

    let body = body_json(response).await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["products"], serde_json::json!([]));
    assert!(body["error"].as_str().unwrap().starts_with("all platforms failed"));
    Ok(())
}

#[tokio::test]
async fn test_search_rejects_bad_queries() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubConnector::ok(Platform::Ebay, vec![])]).await;

    let response = make_request(&app, Method::GET, "/api/v1/search").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await?;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let long_query = "a".repeat(201);
    let response = make_request(&app, Method::GET, &format!("/api/v1/search?q={}", long_query)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = make_request(&app, Method::GET, "/api/v1/search?q=%20").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn test_price_range_is_applied() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubConnector::ok(
        Platform::BestBuy,
        vec![product("a", "5"), product("b", "50"), product("c", "500")],
    )])
    .await;

    // Inverted bounds are swapped rather than rejected
    let response = make_request(&app, Method::GET, "/api/v1/search?q=speaker&min_price=100&max_price=10").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    let ids: Vec<&str> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b"]);
    Ok(())
}

#[tokio::test]
async fn test_repeated_search_is_served_from_cache() -> anyhow::Result<()> {
    let stub = StubConnector::ok(Platform::Ebay, vec![product("e1", "10")]);
    let calls = stub.call_counter();
    let app = create_test_app(vec![stub]).await;

    let first = make_request(&app, Method::GET, "/api/v1/search?q=Nike%20Sneakers").await?;
    let second = make_request(&app, Method::GET, "/api/v1/search?q=nike%20sneakers%20").await?;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A different option set is a different cache entry
    make_request(&app, Method::GET, "/api/v1/search?q=nike%20sneakers&max_results=3").await?;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_searches_share_one_fan_out() -> anyhow::Result<()> {
    let stub = StubConnector::ok(Platform::Walmart, vec![product("w1", "10")])
        .with_delay(Duration::from_millis(100));
    let calls = stub.call_counter();
    let app = create_test_app(vec![stub]).await;

    let (first, second) = tokio::join!(
        make_request(&app, Method::GET, "/api/v1/search?q=blender"),
        make_request(&app, Method::GET, "/api/v1/search?q=blender"),
    );

    let first = body_json(first?).await?;
    let second = body_json(second?).await?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first["products"], second["products"]);
    assert_eq!(first["searchTime"], second["searchTime"]);
    Ok(())
}

#[tokio::test]
async fn test_biggest_discount_deals() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubConnector::ok(
        Platform::Amazon,
        vec![discounted("half", "50", "100"), discounted("none", "80", "80")],
    )])
    .await;

    let response = make_request(&app, Method::GET, "/api/v1/deals?q=jacket&kind=biggest_discount&limit=5").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=600"
    );

    let body = body_json(response).await?;
    assert_eq!(body["kind"], "biggest_discount");
    assert_eq!(body["query"], "jacket");
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["products"][0]["id"], "half");
    assert_eq!(body["platformResults"]["amazon"]["count"], 2);
    Ok(())
}

#[tokio::test]
async fn test_top_rated_deals_default_limit() -> anyhow::Result<()> {
    let records = (0..15)
        .map(|i| rated(&format!("p{:02}", i), "10", 4.0, i * 10))
        .collect();
    let app = create_test_app(vec![StubConnector::ok(Platform::Ebay, records)]).await;

    let response = make_request(&app, Method::GET, "/api/v1/deals?q=kettle&kind=top_rated").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 10);
    assert_eq!(products[0]["id"], "p14");
    Ok(())
}

#[tokio::test]
async fn test_deals_rejects_bad_kind_and_limit() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubConnector::ok(Platform::Ebay, vec![])]).await;

    let response = make_request(&app, Method::GET, "/api/v1/deals?q=tv&kind=cheapest").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = make_request(&app, Method::GET, "/api/v1/deals?q=tv&limit=0").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = make_request(&app, Method::GET, "/api/v1/deals?q=tv&limit=101").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_cors_allows_any_origin() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubConnector::ok(Platform::Ebay, vec![])]).await;

    let request = axum::http::Request::builder()
        .uri("/api/v1/platforms")
        .header(header::ORIGIN, "https://shop.example.com")
        .body(axum::body::Body::empty())?;
    let response = app.clone().oneshot(request).await?;

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_route() -> anyhow::Result<()> {
    let app = create_test_app(vec![]).await;
    let response = make_request(&app, Method::GET, "/api/v1/products").await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
