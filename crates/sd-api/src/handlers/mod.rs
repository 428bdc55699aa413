//! API request handlers

pub mod applications;
pub mod inventory;
pub mod tools;
