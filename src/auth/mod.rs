//! Authentication module for the AI Gateway.
//!
//! Calling services present a shared bearer token on the generate routes.

mod middleware;
mod service_token;

pub use middleware::*;
pub use service_token::*;
