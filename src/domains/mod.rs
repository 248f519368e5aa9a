//! Domains module containing business logic organized by bounded contexts.
//!
//! The server exposes a single domain: declaratively configured tools that
//! proxy to HTTP endpoints.

pub mod tools;
