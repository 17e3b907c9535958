//! Forever Core Library
//!
//! Settings, request-correlated logging, response codes and the user domain
//! shared by the forever backend.

pub mod cache;
pub mod config;
pub mod error;
pub mod logger;
pub mod message;
pub mod user;

// Re-export core types and error handling
pub use config::{RunMode, Settings};
pub use error::{Error, Result};
pub use logger::{Logger, RequestContext};
pub use message::Code;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        cache::*,
        config::*,
        logger::{ExecutionId, LogLevel, Logger, RequestContext, RouteTable},
        message::*,
        user::*,
    };
}
