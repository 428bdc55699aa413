//! # sd-core
//!
//! Core types, traits, and utilities for the service desk.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - The error taxonomy shared by every layer
//! - Result type aliases
//! - Core traits (Identifiable, Timestamped, Entity)
//! - Pagination types
//! - Configuration types and loading

pub mod config;
pub mod error;
pub mod pagination;
pub mod result;
pub mod traits;

pub use error::*;
pub use pagination::*;
pub use result::*;
pub use traits::*;
