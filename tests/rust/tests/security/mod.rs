//! Security integration tests
//!
//! Encryption at rest and secret redaction.
