//! Input/output operations and error handling

/// Command-line surface and run orchestration
pub mod cli;
/// Conditioning data ingestion
pub mod conditional;
/// Constants and runtime defaults
pub mod configuration;
/// Error types and result alias
pub mod error;
/// GSLIB grid documents
pub mod gslib;
/// Console progress reporting
pub mod progress;
