//! # palaver-session
//!
//! The session identity registry: a process-wide concurrent map from session
//! identifier to the authenticated identity that owns the session.
//!
//! Seeded when a session's CONNECT frame authenticates, consulted on every
//! later frame of that session (frames may be processed by any worker), and
//! evicted when the DISCONNECT frame is observed.

pub mod registry;

pub use registry::SessionRegistry;
