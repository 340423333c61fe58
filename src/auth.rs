//! Authentication plugins.
//!
//! `encode(password, challenge) -> bytes`, looked up by the name the server
//! advertised in its greeting. `mysql_native_password` is the only
//! mandatory plugin (spec.md §4.3); an unrecognised name fails the
//! handshake rather than silently sending an empty response.

use digest::{Digest, OutputSizeUser};
use generic_array::GenericArray;
use sha1::Sha1;

use crate::error::{Error, Result};

pub trait AuthPlugin {
    fn encode(&self, password: &str, challenge: &[u8]) -> Vec<u8>;
}

pub struct MySqlNativePassword;

impl AuthPlugin for MySqlNativePassword {
    /// Empty password -> empty response. Otherwise:
    /// `SHA1(password) XOR SHA1(challenge ‖ SHA1(SHA1(password)))`.
    fn encode(&self, password: &str, challenge: &[u8]) -> Vec<u8> {
        if password.is_empty() {
            return Vec::new();
        }

        scramble_sha1(password, challenge).to_vec()
    }
}

/// `SHA1(password) XOR SHA1(seed ‖ SHA1(SHA1(password)))`, per the
/// `mysql_native_password` plugin (spec.md §4.3).
fn scramble_sha1(
    password: &str,
    seed: &[u8],
) -> GenericArray<u8, <Sha1 as OutputSizeUser>::OutputSize> {
    let mut pw_hash = Sha1::digest(password.as_bytes());
    let pw_hash_hash = Sha1::digest(pw_hash);

    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(pw_hash_hash);
    let seed_hash_hash = hasher.finalize();

    for (b, s) in pw_hash.iter_mut().zip(seed_hash_hash.iter()) {
        *b ^= *s;
    }

    pw_hash
}

/// Looks up an [`AuthPlugin`] by the name the server advertised.
pub fn lookup(name: &str) -> Result<Box<dyn AuthPlugin + Send + Sync>> {
    match name {
        "mysql_native_password" => Ok(Box::new(MySqlNativePassword)),
        other => Err(Error::invalid_argument(format!(
            "unknown authentication plugin: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_password_yields_empty_response() {
        let challenge = [1u8; 20];
        assert!(MySqlNativePassword.encode("", &challenge).is_empty());
    }

    #[test]
    fn nonempty_password_yields_20_bytes() {
        let challenge = [1u8; 20];
        assert_eq!(MySqlNativePassword.encode("hunter2", &challenge).len(), 20);
    }

    #[test]
    fn encoding_is_deterministic() {
        let challenge = [7u8; 20];
        let a = MySqlNativePassword.encode("hunter2", &challenge);
        let b = MySqlNativePassword.encode("hunter2", &challenge);
        assert_eq!(a, b);
    }

    #[test]
    fn encoding_is_sensitive_to_every_bit_of_the_password() {
        let challenge = [7u8; 20];
        let base = MySqlNativePassword.encode("hunter2", &challenge);
        let flipped = MySqlNativePassword.encode("Hunter2", &challenge);
        assert_ne!(base, flipped);
    }

    #[test]
    fn encoding_is_sensitive_to_every_bit_of_the_challenge() {
        let mut challenge = [7u8; 20];
        let base = MySqlNativePassword.encode("hunter2", &challenge);
        challenge[19] ^= 0x01;
        let flipped = MySqlNativePassword.encode("hunter2", &challenge);
        assert_ne!(base, flipped);
    }

    #[test]
    fn unknown_plugin_is_rejected() {
        assert!(lookup("some_future_plugin").is_err());
    }

    #[test]
    fn empty_password_boundary_scenario_with_fixed_challenge() {
        // spec.md §8, boundary scenario 1: challenge of 20 bytes of 0x01,
        // password = "", response must be empty.
        let challenge = [0x01u8; 20];
        assert_eq!(MySqlNativePassword.encode("", &challenge), Vec::<u8>::new());
    }
}
