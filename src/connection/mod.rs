// WebSocket session transport

pub mod manager;

pub use manager::ConnectionManager;
