// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the login server.

pub mod access;

pub use access::{client_key, enforce_access};

#[cfg(test)]
mod tests;
