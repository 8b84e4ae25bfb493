//! API Module
//!
//! HTTP handlers and routing for the cache admin API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /metrics` - Hit/miss counters per resource type
//! - `DELETE /cache/:resource` - Invalidate every entry of a type
//! - `DELETE /cache/:resource/:id` - Invalidate one resource

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
