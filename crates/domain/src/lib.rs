//! # Authway Domain
//!
//! Data types shared by the Authway client engine and the applications that
//! consume it.
//!
//! This crate contains:
//! - Client configuration (`AuthwayConfig`) with the SDK's defaults
//! - The error taxonomy (`AuthError`) and Result alias
//! - The observable authentication state and its transition function
//! - ID-token user claims
//! - Storage key names and endpoint constants
//!
//! ## Architecture
//! - No dependencies on other Authway crates
//! - No I/O: everything here is pure data and pure functions

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
