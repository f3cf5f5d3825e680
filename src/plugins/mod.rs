pub mod traits;
pub mod manager;
pub mod connectors;

pub use manager::ConnectorRegistry;
pub use traits::ConnectorPlugin;
