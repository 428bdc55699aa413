//! # sd-contracts
//!
//! Validation contracts for the service desk.
//!
//! Contracts check input and state before a workflow mutates anything.
//! They never touch a store: everything they need is passed in.

pub mod applications;
pub mod base;
pub mod inventory;
pub mod tools;

pub use base::*;
