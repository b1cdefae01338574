//! WebSocket endpoint: handshake admission and the STOMP session loop.

pub mod admission;
pub mod handler;

pub use admission::{authorize_handshake, Admission};
pub use handler::{websocket_handler, WsSettings};
