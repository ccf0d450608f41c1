//! Statik Core Library
//!
//! This crate provides the shared pieces of the Statik workspace: the error
//! type used at construction time and the configuration model with its loader.

pub mod config;
pub mod error;

pub use error::{Error, Result};

/// Statik version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
