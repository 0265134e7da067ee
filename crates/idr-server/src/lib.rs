//! HTTP server for identity reconciliation.
//!
//! Exposes `POST /identify` over an [`IdentityResolver`](idr_resolver::IdentityResolver),
//! validates request bodies, and maps resolver failures to HTTP statuses.

pub mod api;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;
pub mod validate;

pub use api::{HealthResponse, IdentifyRequest, IdentifyResponse};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::IdentityServer;
pub use state::AppState;
pub use validate::{validate_email, validate_identify, FieldError};
