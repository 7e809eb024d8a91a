//! # Middleware Modules
//!
//! Tower middleware layers and recorder helpers for the API service.

pub mod metrics;
