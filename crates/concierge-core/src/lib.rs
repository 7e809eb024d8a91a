//! # concierge-core — Foundational Types for the Concierge Platform
//!
//! Leaf crate of the workspace. Defines the identifier newtypes, the UTC
//! timestamp type, and the top-level error enum shared by every other
//! `concierge-*` crate. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `CaseId` and `StageId` wrap a
//!    UUID so a stage identifier can never be passed where a case
//!    identifier is expected.
//!
//! 2. **UTC-only timestamps.** `Timestamp` is a UTC instant at whole-second
//!    resolution, written with a `Z` suffix.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `concierge-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::ConciergeError;
pub use identity::{CaseId, StageId};
pub use temporal::Timestamp;
