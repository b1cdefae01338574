// Palaver server library: configuration, logging, middleware, wiring.

pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod middleware;
pub mod routes;
