//! Core business logic for campus-rs: the relationship graph and content
//! visibility engine.
//!
//! Every content-access path goes through
//! [`services::visibility::VisibilityService`]; every relationship mutation
//! goes through the workflow service owning it. The services are plain
//! structs over repositories — the transport layer above decides how they
//! are exposed.

pub mod services;

pub use services::*;
