//! docfuse-core - Core types and traits for the docfuse retrieval engine
//!
//! This crate provides the foundational types, boundary traits, error
//! handling, and configuration used throughout the docfuse workspace.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{FuseError, Result};
pub use traits::*;
pub use types::*;
