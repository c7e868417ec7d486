//! Password hashing.
//!
//! PBKDF2-HMAC-SHA256 with a per-user random 16-byte salt. The derived
//! key is a single SHA-256 block (32 bytes), so the PBKDF2 inner loop
//! reduces to iterating HMAC over one block.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// PBKDF2 iteration count. Changing this breaks verification of existing
/// hashes; a bump requires a re-hash migration.
const ITERATIONS: u32 = 100_000;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Derives a 32-byte PBKDF2-HMAC-SHA256 key for `password` and `salt`.
fn derive(password: &str, salt: &[u8]) -> [u8; 32] {
    // F(P, S, c, 1) = U1 ^ U2 ^ ... ^ Uc
    // U1 = HMAC(P, S || INT(1)), Ui = HMAC(P, Ui-1)
    let mut mac = HmacSha256::new_from_slice(password.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut u: [u8; 32] = mac.finalize().into_bytes().into();
    let mut out = u;

    for _ in 1..ITERATIONS {
        let mut mac = HmacSha256::new_from_slice(password.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(&u);
        u = mac.finalize().into_bytes().into();
        for (o, b) in out.iter_mut().zip(u.iter()) {
            *o ^= b;
        }
    }

    out
}

/// Hashes a password with a fresh random salt.
///
/// Returns `(hash_hex, salt_hex)` for storage.
pub fn hash_password(password: &str) -> (String, String) {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let hash = derive(password, &salt);
    (hex::encode(hash), hex::encode(salt))
}

/// Verifies a password against a stored `(hash_hex, salt_hex)` pair.
///
/// Comparison is constant-time over the derived key. Malformed stored
/// values verify as `false` rather than erroring — a corrupt row should
/// read as a failed login, not a 500.
pub fn verify_password(password: &str, hash_hex: &str, salt_hex: &str) -> bool {
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };
    if expected.len() != 32 {
        return false;
    }

    let derived = derive(password, &salt);
    let mut diff = 0u8;
    for (a, b) in derived.iter().zip(expected.iter()) {
        diff |= a ^ b;
    }
    diff == 0
}
