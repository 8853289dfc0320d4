//! HTTP API for gestor.
//!
//! This module exposes the file, user, role and folder operations as a
//! JSON REST API served by axum.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::{ApiError, ErrorCode};
pub use handlers::AppState;
pub use router::{create_router, ApiDoc};
pub use server::WebServer;
