pub mod audit_log;
pub mod background;
pub mod cleanup;
pub mod identity;
pub mod session_policy;
pub mod session_validator;
