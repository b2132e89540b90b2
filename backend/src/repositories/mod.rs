pub mod memory_session;
pub mod session;

pub use memory_session::InMemorySessionStore;
pub use session::{PgSessionStore, SessionStore};
