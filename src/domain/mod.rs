pub mod advertising;
pub mod auth;
pub mod connection;
pub mod log_transport;
pub mod models;
pub mod sampling;
pub mod settings;
