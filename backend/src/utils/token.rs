use rand::{rngs::OsRng, RngCore};

const SESSION_TOKEN_BYTES: usize = 32;

/// Generates an opaque session identifier: 256 bits from the OS CSPRNG, hex
/// encoded. Collisions are negligible, so the store is never consulted.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
