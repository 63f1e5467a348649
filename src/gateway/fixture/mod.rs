pub mod adapter;
pub mod data;

pub use adapter::FixtureGateway;
