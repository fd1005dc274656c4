//! Domain entities

mod authorization_state;
mod credential;
mod provider;
mod provider_data;
mod provider_result;

pub use authorization_state::*;
pub use credential::*;
pub use provider::*;
pub use provider_data::*;
pub use provider_result::*;
