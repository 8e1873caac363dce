// Wire protocol (commands and server messages)
pub mod protocol;

// Unit table and synchronization core
pub mod state;

// Room membership and fan-out
pub mod room;

// Per-connection WebSocket sessions
pub mod connection;

// HTTP and WebSocket APIs
pub mod api;

// Configuration
pub mod config;
