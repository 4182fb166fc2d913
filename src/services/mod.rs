//! Business logic services.
//!
//! Services contain the core logic separated from HTTP handlers. Each
//! public operation opens one store transaction, validates, writes and
//! commits, so callers never observe a half-applied change.

pub mod expiry;
pub mod inventory_service;
pub mod lifecycle_service;
pub mod reservation_service;
