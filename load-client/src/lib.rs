pub mod client;
pub mod config;
pub mod provider;
pub mod scenario;
pub mod statistics;
