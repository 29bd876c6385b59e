//! Data Transfer Objects
//!
//! Wire shapes for the registry REST API and the token validation endpoint.
//! DTOs stay close to the JSON the registry speaks and are converted into
//! domain types at the crate boundary.

pub mod job;
pub mod token;
