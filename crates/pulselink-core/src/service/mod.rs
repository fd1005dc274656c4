//! Domain services
//!
//! Business logic that operates on domain entities via repositories.

mod disconnection;
mod fallback;

pub use disconnection::*;
pub use fallback::*;
