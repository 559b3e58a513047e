//! HTTP and websocket surface.

pub mod handlers;
pub mod router;

pub use router::{create_router, AppState};
