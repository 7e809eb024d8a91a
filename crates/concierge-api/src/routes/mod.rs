//! # API Route Modules
//!
//! - `cases` — case creation and reads, validated case and stage status
//!   changes, workflow actions and permission predicates.

pub mod cases;
