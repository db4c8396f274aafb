//! In-process adapters that live inside the domain crate for convenience.
//!
//! The in-memory stores back both the unit tests and the api-server; a real
//! persistence adapter would live in a separate crate.

pub mod memory_repo;
