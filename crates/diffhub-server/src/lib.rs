//! HTTP server for diffhub.
//!
//! Exposes comparison submission and polling, branch listing, and a
//! server-sent event stream through which clients receive completion
//! notifications for the channels they subscribe to.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{DiffSection, ServerConfig, ServiceConfig};
pub use error::{ApiError, ServerError, ServerResult};
pub use router::build_router;
pub use server::DiffhubServer;
pub use state::AppState;
