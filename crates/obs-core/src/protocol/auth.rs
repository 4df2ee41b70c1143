//! Authentication proof for the Identify handshake.
//!
//! The server's Hello carries a `salt` and a single-use `challenge`.  The
//! client proves knowledge of the shared password without sending it:
//!
//! ```text
//! secret = base64(sha256(password + salt))
//! proof  = base64(sha256(secret + challenge))
//! ```
//!
//! Both base64 steps use the standard alphabet with padding.

use base64::prelude::*;
use sha2::{Digest, Sha256};

/// Computes the `authentication` string for an Identify frame.
///
/// # Examples
///
/// ```rust
/// use obs_core::authentication_proof;
///
/// let proof = authentication_proof("secret", "def", "abc");
/// assert_eq!(proof, "mi0p3v5/XQ3mb2qMxK0B6OOeFdqzUtSLRO5bxGlAPA4=");
/// ```
pub fn authentication_proof(password: &str, salt: &str, challenge: &str) -> String {
    let secret = base64_sha256(&[password.as_bytes(), salt.as_bytes()]);
    base64_sha256(&[secret.as_bytes(), challenge.as_bytes()])
}

fn base64_sha256(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    BASE64_STANDARD.encode(hasher.finalize())
}
