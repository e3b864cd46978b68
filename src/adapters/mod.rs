pub mod health_client;
pub mod http_handler;
pub mod http_server;
pub mod middleware;
pub mod router;

/// Re-export commonly used types from adapters
pub use health_client::{HealthCheckError, check_health};
pub use http_handler::{ApiError, AppState};
pub use http_server::{HttpServer, ServerError, ServerHandle, ServerState};
pub use middleware::{ClientIp, REQUEST_TIMEOUT, RequestId, X_REQUEST_ID};
pub use router::build_router;
