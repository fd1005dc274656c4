//! # Pulselink Core Library
//!
//! Domain types and rules for delegated access to third-party Google data
//! providers on behalf of a client account.
//!
//! ## Modules
//!
//! - `branding` - Centralized product constants
//! - `domain` - Core entities (Provider registry, Credential, AuthorizationState, results)
//! - `error` - Error taxonomy shared by every layer
//! - `repository` - Data access traits
//! - `service` - Pure domain services (fallback data, disconnection detection)

pub mod branding;
pub mod domain;
pub mod error;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use domain::*;
pub use error::{ConnectError, ConnectResult};
pub use repository::*;
pub use service::*;
