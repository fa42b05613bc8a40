//! Token generation for clip identifiers and session cookies.
//!
//! Clip tokens must be unique across the whole system, including clips
//! generated in the same request at the same instant, so wall-clock time is
//! not part of the construction. 16 bytes of OS randomness hex-encoded makes
//! a collision practically unreachable; the storage layer still rejects one
//! with a conditional put should it ever happen.

use data_encoding::HEXLOWER;
use rand::RngCore;

/// 32-char lowercase hex token naming a clip's payload system-wide.
pub fn sound_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    HEXLOWER.encode(&bytes)
}

/// Session cookie value. Longer than clip tokens since it is a credential.
pub fn session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    HEXLOWER.encode(&bytes)
}
