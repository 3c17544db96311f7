pub mod config;
pub mod handlers;
pub mod observability;
pub mod provisioner;
pub mod server;
pub mod state;

pub use observability::{apply_logging_level, init_tracing, shutdown_tracing};
pub use server::{CoxswainServer, ServerBuilder, build_app};
pub use state::AppState;
