//! # pagepilot-server
//!
//! Network transport for a pagepilot session. Clients drive the session over
//! a WebSocket at `/ws`; plain HTTP routes expose health, reset and the
//! latest verification report.
//!
//! All commands, whichever route they arrive on, go through the session's
//! single command queue.

mod server;
mod ws;

pub use server::{router, serve, AppState, SharedState};
