pub mod error;
pub mod price;
