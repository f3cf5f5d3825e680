pub mod amazon;
pub mod bestbuy;
pub mod ebay;
pub mod http;
pub mod walmart;

pub use amazon::AmazonConnector;
pub use bestbuy::BestBuyConnector;
pub use ebay::EbayConnector;
pub use http::ConnectorHttp;
pub use walmart::WalmartConnector;
