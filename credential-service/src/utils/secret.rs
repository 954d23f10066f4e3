use rand::RngCore;

/// Bytes of entropy in every issued secret.
pub const SECRET_BYTES: usize = 32;

/// Generate an unguessable credential secret: 256 bits from the thread-local
/// CSPRNG, hex encoded (64 chars).
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
