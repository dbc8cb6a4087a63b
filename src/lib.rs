//! WebRTC signaling relay.
//!
//! Clients log in under a unique name, create or join named rooms, and use
//! the relay to exchange offers, answers and ICE candidates with each other
//! before opening a direct peer connection. No media passes through here.

// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;

// Domain layer
pub mod connection_manager;
pub mod signaling;

// Application layer
pub mod api;
pub mod server;
pub mod websocket;
