//! Core types and traits for pageforge
//!
//! This crate contains domain types shared across all other crates.

mod constants;
mod draft;
mod env_config;
mod error;
mod finalize;
mod session;
mod site;
mod version;

pub use constants::*;
pub use draft::*;
pub use env_config::*;
pub use error::*;
pub use finalize::*;
pub use session::*;
pub use site::*;
pub use version::*;
