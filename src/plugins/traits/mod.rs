pub mod connector;

pub use connector::{normalize_batch, ConnectorPlugin};
