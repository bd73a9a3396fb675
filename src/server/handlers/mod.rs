pub mod config;
pub mod health;
pub mod query;
pub mod store;
pub mod upload;
