//! # parley-server
//!
//! HTTP surface of Parley: chat streaming over SSE, provider discovery,
//! push-token registration and async trigger/schedule.

pub mod error;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;
