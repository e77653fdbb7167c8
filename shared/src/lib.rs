//! Shared types and models for the weather forecast platform
//!
//! This crate contains the domain model shared between the backend, browser
//! clients (via WASM), and other components of the system: observations,
//! predictions, forecast days, and the pure classification and assembly rules
//! that operate on them.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
