//! # palaver-api
//!
//! The HTTP surface of Palaver: the WebSocket upgrade endpoint with its
//! handshake gate, the STOMP session loop, the REST messaging API, and the
//! bearer-token middleware protecting it.

pub mod handlers;
pub mod middleware;
