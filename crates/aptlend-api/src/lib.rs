//! aptlend-api: HTTP API layer for aptlend
//!
//! JSON endpoints over the contract snapshot, the payload builders, the
//! wallet session and the REST backend.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::AppState;
