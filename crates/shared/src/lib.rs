//! Shared configuration for swiftblob.
//!
//! This crate provides the settings consumed by the other crates:
//! - Object store location, credentials and container
//! - Per-connection overrides (chunk size, TLS verification, timeouts)
//! - Logging filter and output format

pub mod config;

pub use config::{AppConfig, ConnectionSettings, LogFormat, LogSettings, ProviderKind, StorageSettings};
