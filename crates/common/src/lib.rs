//! Utilities shared across the function host crates.

#![warn(clippy::pedantic)]

/// Module for JWT inspection helpers (size limit, kid extraction, iat checks)
pub mod jwt;
