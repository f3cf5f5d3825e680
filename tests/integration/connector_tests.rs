use super::*;
use deal_aggregator::plugins::connectors::{
    AmazonConnector, BestBuyConnector, EbayConnector, WalmartConnector,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connector_config(server: &MockServer) -> ConnectorConfig {
    ConnectorConfig {
        retry_attempts: 1,
        retry_delay_ms: 10,
        ..ConnectorConfig::new(server.uri(), Some("test-key"))
    }
}

fn options() -> SearchOptions {
    SearchOptions::default().normalized(25, 100)
}

const TIMEOUT: Duration = Duration::from_secs(2);

fn amazon_body() -> serde_json::Value {
    json!({
        "search_results": [
            {
                "asin": "B0SHOE1",
                "title": "Air Zoom Pegasus",
                "brand": "Nike",
                "price": {"value": 89.99, "currency": "USD"},
                "list_price": {"value": 130.0},
                "rating": 4.7,
                "ratings_total": 5210,
                "image": "https://img.example.com/b0shoe1.jpg",
                "link": "https://www.amazon.com/dp/B0SHOE1",
                "category": "Running Shoes",
                "availability": {"type": "in_stock"}
            },
            {
                "asin": "B0SHOE2",
                "title": "Revolution 6",
                "price": {"value": 55},
                "availability": {"type": "out_of_stock"}
            },
            {
                "asin": "B0NOPRICE",
                "title": "Listing without a price"
            }
        ]
    })
}

#[tokio::test]
async fn test_amazon_search_maps_products() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "running shoes"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("max_results", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(amazon_body()))
        .expect(1)
        .mount(&server)
        .await;

    let connector = AmazonConnector::new(connector_config(&server), TIMEOUT)?;
    let products = connector.execute("running shoes", &options(), TIMEOUT).await?;

    assert_eq!(products.len(), 2);
    let first = &products[0];
    assert_eq!(first.id, "B0SHOE1");
    assert_eq!(first.platform, Platform::Amazon);
    assert_eq!(first.brand, "Nike");
    assert_eq!(first.price, "89.99".parse::<Decimal>()?);
    assert_eq!(first.original_price, Some("130".parse::<Decimal>()?));
    assert_eq!(first.currency, "usd");
    assert_eq!(first.review_count, Some(5210));
    assert!(first.in_stock);

    let second = &products[1];
    assert_eq!(second.brand, "");
    assert_eq!(second.original_price, None);
    assert!(!second.in_stock);
    Ok(())
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let connector = AmazonConnector::new(connector_config(&server), TIMEOUT)?;
    let err = connector.execute("tv", &options(), TIMEOUT).await.unwrap_err();

    assert_eq!(err.kind(), "auth_failure");
    assert_eq!(err.platform(), Platform::Amazon);
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_is_retried() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(amazon_body()))
        .expect(1)
        .mount(&server)
        .await;

    let connector = AmazonConnector::new(connector_config(&server), TIMEOUT)?;
    let products = connector.execute("running shoes", &options(), TIMEOUT).await?;
    assert_eq!(products.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_server_error_exhausts_retries() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let connector = AmazonConnector::new(connector_config(&server), TIMEOUT)?;
    let err = connector.execute("tv", &options(), TIMEOUT).await.unwrap_err();

    assert_eq!(err.kind(), "network_error");
    assert!(err.to_string().contains("500"));
    Ok(())
}

#[tokio::test]
async fn test_malformed_bodies() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "bad"})))
        .mount(&server)
        .await;

    let amazon = AmazonConnector::new(connector_config(&server), TIMEOUT)?;
    let err = amazon.execute("tv", &options(), TIMEOUT).await.unwrap_err();
    assert_eq!(err.kind(), "malformed_response");

    let bestbuy = BestBuyConnector::new(connector_config(&server), TIMEOUT)?;
    let err = bestbuy.execute("tv", &options(), TIMEOUT).await.unwrap_err();
    assert_eq!(err.kind(), "malformed_response");
    assert_eq!(err.platform(), Platform::BestBuy);
    Ok(())
}

#[tokio::test]
async fn test_missing_credentials_make_no_call() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(amazon_body()))
        .expect(0)
        .mount(&server)
        .await;

    let config = ConnectorConfig {
        api_key: None,
        ..connector_config(&server)
    };
    let connector = EbayConnector::new(config, TIMEOUT)?;
    let err = connector.execute("tv", &options(), TIMEOUT).await.unwrap_err();
    assert_eq!(err.kind(), "auth_failure");
    Ok(())
}

#[tokio::test]
async fn test_ebay_sends_bearer_token() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/buy/browse/v1/item_summary/search"))
        .and(header("authorization", "Bearer test-key"))
        .and(query_param("q", "camera"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "itemSummaries": [{
                "itemId": "v1|1234|0",
                "title": "Mirrorless Camera Body",
                "price": {"value": "449.00", "currency": "USD"},
                "marketingPrice": {"originalPrice": {"value": "599.00", "currency": "USD"}},
                "image": {"imageUrl": "https://i.ebayimg.com/1234.jpg"},
                "itemWebUrl": "https://www.ebay.com/itm/1234",
                "categories": [{"categoryName": "Digital Cameras"}, {"categoryName": "Cameras & Photo"}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = EbayConnector::new(connector_config(&server), TIMEOUT)?;
    let products = connector
        .execute("camera", &options().with_max_results(5), TIMEOUT)
        .await?;

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, "v1|1234|0");
    assert_eq!(products[0].category.as_deref(), Some("Digital Cameras"));
    assert_eq!(products[0].rating, None);
    assert!(products[0].discount_fraction().is_some());
    Ok(())
}

#[tokio::test]
async fn test_ebay_no_matches_is_empty_success() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/buy/browse/v1/item_summary/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0})))
        .mount(&server)
        .await;

    let connector = EbayConnector::new(connector_config(&server), TIMEOUT)?;
    let products = connector.execute("zzzz", &options(), TIMEOUT).await?;
    assert!(products.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_walmart_consumer_header_and_string_amounts() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(header("wm_consumer.id", "test-key"))
        .and(query_param("query", "blender"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "itemId": 55501,
                "name": "Countertop Blender",
                "brandName": "Ninja",
                "salePrice": 79.0,
                "msrp": "$1,099.00",
                "customerRating": "4.4",
                "numReviews": 812,
                "categoryPath": "Home/Kitchen/Blenders",
                "stock": "Available"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = WalmartConnector::new(connector_config(&server), TIMEOUT)?;
    let products = connector.execute("blender", &options(), TIMEOUT).await?;

    assert_eq!(products.len(), 1);
    let blender = &products[0];
    assert_eq!(blender.id, "55501");
    assert_eq!(blender.original_price, Some("1099.00".parse::<Decimal>()?));
    assert_eq!(blender.category.as_deref(), Some("Blenders"));
    assert!((blender.rating.unwrap() - 4.4).abs() < 1e-9);
    assert!(blender.in_stock);
    Ok(())
}

#[tokio::test]
async fn test_bestbuy_query_parameters() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(query_param("search", "headphones"))
        .and(query_param("apiKey", "test-key"))
        .and(query_param("pageSize", "25"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [{
                "sku": 6505727,
                "name": "Wireless Noise Cancelling Headphones",
                "manufacturer": "Sony",
                "salePrice": 278.0,
                "regularPrice": 399.99,
                "customerReviewAverage": 4.8,
                "customerReviewCount": 3100,
                "categoryPath": [{"name": "Audio"}, {"name": "Headphones"}],
                "onlineAvailability": true
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = BestBuyConnector::new(connector_config(&server), TIMEOUT)?;
    let products = connector.execute("headphones", &options(), TIMEOUT).await?;

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, "6505727");
    assert_eq!(products[0].platform, Platform::BestBuy);
    assert_eq!(products[0].category.as_deref(), Some("Headphones"));
    Ok(())
}

#[tokio::test]
async fn test_slow_backend_times_out() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(amazon_body())
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let timeout = Duration::from_millis(100);
    let connector = AmazonConnector::new(connector_config(&server), timeout)?;
    let err = connector.execute("tv", &options(), timeout).await.unwrap_err();

    assert_eq!(err.kind(), "timeout");
    assert_eq!(err.platform(), Platform::Amazon);
    Ok(())
}
