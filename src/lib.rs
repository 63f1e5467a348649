pub mod config;
pub mod gateway;
pub mod models;
pub mod services;
