//! REST API for the Bastion asset inventory
//!
//! Exposes asset listing, CRUD, gateway selection and background tasks
//! under `/api/assets/v1`, guarded by the RBAC engine.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod server;
pub mod state;
pub mod task_client;

pub use error::{ApiError, Result};
pub use middleware::RequestContext;
pub use routes::create_router;
pub use seed::Seed;
pub use server::{Server, ServerBuilder, ServerConfig};
pub use state::AppState;
pub use task_client::{spawn_forwarder, TaskApiClient, TaskApiError};

/// API version
pub const API_VERSION: &str = "v1";
