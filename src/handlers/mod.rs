//! WebSocket handlers.

pub mod relay;
