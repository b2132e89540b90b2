//! Data models shared across storage and API handlers.

pub mod audit_log;
pub mod session;
pub mod user;
