pub mod adapter;
pub mod client;

pub use adapter::HttpGateway;
pub use client::ApiClient;
