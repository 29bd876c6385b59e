//! Labtrail Core
//!
//! Core types shared by the labtrail crates.
//!
//! This crate contains:
//! - Domain types: audit log entries, job ids, registry operations, session context
//! - DTOs: payloads exchanged with the registry and its token endpoint

pub mod domain;
pub mod dto;
