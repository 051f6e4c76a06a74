//! Tokenq API server library.
//!
//! Exposes the building blocks (config, state, error handling, session
//! registry, routes, WebSocket infrastructure) so integration tests and
//! the binary entrypoint can both access them.

pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;
pub mod ws;
