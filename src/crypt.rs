//! Password hashing seam for user customizations.
//!
//! Blueprint user passwords may arrive either pre-hashed (any crypt(3)
//! `$...` form) or as plaintext. Plaintext is hashed to a salted
//! sha512-crypt string before it is embedded in a users stage; the hash
//! itself is opaque to the rest of the engine.

use sha_crypt::{sha512_simple, Sha512Params};

use crate::error::{Error, Result};

/// Returns true if the string already looks like a crypt(3) hash.
///
/// All modular crypt formats start with `$` (`$6$` for sha512-crypt,
/// `$2b$` for bcrypt, ...). A plaintext password starting with `$` would
/// be mistaken for a hash; that matches the upstream tooling this wire
/// format is compatible with.
pub fn password_is_crypted(password: &str) -> bool {
    password.starts_with('$')
}

/// Hash a plaintext password into a sha512-crypt (`$6$...`) string.
pub fn crypt_sha512(password: &str, user: &str) -> Result<String> {
    let params = Sha512Params::new(5_000).map_err(|_| Error::CredentialHashing {
        user: user.to_string(),
    })?;
    sha512_simple(password, &params).map_err(|_| Error::CredentialHashing {
        user: user.to_string(),
    })
}
