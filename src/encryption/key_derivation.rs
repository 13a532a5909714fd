//! Key derivation: PBKDF2-HMAC-SHA256 cipher keys and storage slot keys
//!
//! Two unrelated "keys" live here:
//! - the **cipher key**, 256 bits stretched from the caller's secret and a per-save
//!   random salt with PBKDF2. Iteration count and hash are not stored in the
//!   envelope, so both are fixed constants shared by the seal and open paths.
//! - the **storage key**, the slot name in the durable store, derived from a
//!   record's key names (never its values).

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ring::pbkdf2;
use std::num::NonZeroU32;
use zeroize::Zeroizing;

/// PBKDF2 iteration count. Changing it makes every existing envelope unreadable.
pub const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

/// PBKDF2 PRF
static PBKDF2_ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Derived cipher key length (AES-256)
pub const CIPHER_KEY_LEN: usize = 32;

/// Namespace tag prepended to every derived storage key
pub const STATE_KEY_NAMESPACE: &str = "statekit";

/// Separator placed between key names before encoding
pub const STATE_KEY_SEPARATOR: &str = "---";

/// Derive a 256-bit cipher key from `secret` and `salt`
///
/// Deterministic for identical inputs. The returned key is wiped on drop.
pub fn derive_cipher_key(secret: &[u8], salt: &[u8]) -> Zeroizing<[u8; CIPHER_KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; CIPHER_KEY_LEN]);
    pbkdf2::derive(PBKDF2_ALGORITHM, PBKDF2_ITERATIONS, salt, secret, &mut key[..]);
    key
}

/// Derive the storage slot for a record shape
///
/// Format: `statekit-<base64(name1---name2---...)>`
///
/// Order-dependent: the same names in a different order map to a different slot.
/// Callers whose key order is not stable across call sites should pass an
/// explicit key instead.
pub fn generate_state_key<I, S>(key_names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = key_names
        .into_iter()
        .map(|name| name.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(STATE_KEY_SEPARATOR);

    format!("{}-{}", STATE_KEY_NAMESPACE, BASE64.encode(joined.as_bytes()))
}
