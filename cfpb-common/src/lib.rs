//! # CFPB Common Library
//!
//! Shared code for the complaint clustering tools including:
//! - Error types
//! - TOML bootstrap configuration and root folder resolution
//! - Atomic file writes and data file fingerprinting

pub mod config;
pub mod error;
pub mod fs;

pub use error::{Error, Result};
