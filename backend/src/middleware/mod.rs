pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use request_id::*;
pub use session::*;
