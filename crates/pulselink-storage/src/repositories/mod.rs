//! Repository implementations using SQLite.

mod authorization_state_repository;
mod credential_repository;

pub use authorization_state_repository::SqliteAuthorizationStateRepository;
pub use credential_repository::SqliteCredentialRepository;
