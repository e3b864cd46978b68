pub mod graceful_shutdown;

pub use graceful_shutdown::{DEFAULT_DRAIN_TIMEOUT, GracefulShutdown, ShutdownReason};
