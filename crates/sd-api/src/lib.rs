//! # sd-api
//!
//! JSON REST handlers for the service desk.
//!
//! The acting identity comes from headers set by the authentication
//! gateway in front of the service (see [`extractors::ActorContext`]).

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod multipart;
pub mod routes;

pub use extractors::AppState;
pub use routes::router;
