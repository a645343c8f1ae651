//! Key derivation: password + 16-byte salt → 256-bit key via PBKDF2-HMAC-SHA1

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;

use crate::keys::SymmetricKey;
use crate::{KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};

/// Derive a 256-bit key from a password and salt.
///
/// The password is fed to PBKDF2 as UTF-8. Derivation never fails; a wrong
/// password only shows up later as bad padding on the decrypted body.
pub fn derive_key(password: &SecretString, salt: &[u8; SALT_SIZE]) -> SymmetricKey {
    let mut key = [0u8; KEY_SIZE];
    derive_into(password, salt, PBKDF2_ITERATIONS, &mut key);
    SymmetricKey::from_bytes(key)
}

fn derive_into(password: &SecretString, salt: &[u8], rounds: u32, out: &mut [u8]) {
    pbkdf2_hmac::<Sha1>(password.expose_secret().as_bytes(), salt, rounds, out);
}
