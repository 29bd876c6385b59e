//! Core domain types
//!
//! These types are shared between the registry client (which talks to the
//! remote registry) and the audit layer (which records what was done).

pub mod log;
pub mod operation;
pub mod session;
