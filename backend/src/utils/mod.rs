pub mod cookies;
pub mod device;
pub mod envelope;
pub mod time;
pub mod token;

pub use time::*;
pub use token::*;
