//! Storage integration tests
//!
//! Real SQLite files in temp directories, exercised through the repository
//! traits the gateway uses.

mod credentials;
mod states;
