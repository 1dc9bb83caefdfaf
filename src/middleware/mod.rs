//! Middleware module
//!
//! Contains Tower middleware for session-token authentication.

pub mod auth;
