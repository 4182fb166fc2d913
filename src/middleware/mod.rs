//! HTTP middleware components.
//!
//! Middleware run before route handlers. Here they establish who is
//! calling and reject requests that carry no identity.

/// Trusted-header caller identity
pub mod caller;
