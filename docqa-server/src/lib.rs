//! `docqa-server` exposes document sessions over HTTP.
//! Upload a document once, then index, ask, summarize, and analyze it by session id.

pub mod error;
pub mod protocol;
pub mod server;
pub mod session;

pub use error::ApiError;
pub use server::{
    AppState, DEFAULT_MAX_BODY_BYTES, ServerConfig, app_router, app_router_with_limit, run_server,
};
pub use session::{SessionLimits, SessionManager};
