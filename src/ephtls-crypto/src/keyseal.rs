//! Password-based sealing of PKCS#8 private keys.
//!
//! The bootstrap ships the ephemeral private key to the client in plaintext
//! transport, so it is optionally sealed under a pre-shared [`Secret`] as a
//! PKCS#8 `ENCRYPTED PRIVATE KEY` block (PBES2, PBKDF2-HMAC-SHA256, AES-CBC).
//!
//! # Example
//!
//! ```no_run
//! use ephtls_crypto::keyseal::{open_private_key, seal_private_key, KeyCipher};
//! use ephtls_crypto::{pki, Secret};
//! use std::time::Duration;
//!
//! let cert = pki::make_certificate(Duration::from_secs(30)).unwrap();
//! let secret = Secret::from("Hello World");
//! let sealed = seal_private_key(cert.key_der(), &secret, KeyCipher::Aes256Cbc).unwrap();
//! let der = open_private_key(sealed.as_bytes(), Some(&secret)).unwrap();
//! assert_eq!(der.as_slice(), cert.key_der());
//! ```

use crate::{pem, rng, CryptoError, Result, Secret};
use pkcs8::pkcs5::pbes2;
use pkcs8::{EncryptedPrivateKeyInfo, PrivateKeyInfo};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// PBKDF2 iteration count for sealed keys.
pub const PBKDF2_ITERATIONS: u32 = 10_000;

const SALT_LEN: usize = 16;
const IV_LEN: usize = 16;

/// Symmetric cipher used to seal a private key block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyCipher {
    #[serde(rename = "aes-128-cbc", alias = "aes128")]
    Aes128Cbc,
    #[default]
    #[serde(rename = "aes-256-cbc", alias = "aes256")]
    Aes256Cbc,
}

impl KeyCipher {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyCipher::Aes128Cbc => "aes-128-cbc",
            KeyCipher::Aes256Cbc => "aes-256-cbc",
        }
    }

    fn parameters<'a>(
        &self,
        salt: &'a [u8],
        iv: &'a [u8; IV_LEN],
    ) -> std::result::Result<pbes2::Parameters<'a>, pkcs8::pkcs5::Error> {
        match self {
            KeyCipher::Aes128Cbc => {
                pbes2::Parameters::pbkdf2_sha256_aes128cbc(PBKDF2_ITERATIONS, salt, iv)
            }
            KeyCipher::Aes256Cbc => {
                pbes2::Parameters::pbkdf2_sha256_aes256cbc(PBKDF2_ITERATIONS, salt, iv)
            }
        }
    }
}

impl fmt::Display for KeyCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyCipher {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aes-128-cbc" | "aes128" => Ok(KeyCipher::Aes128Cbc),
            "aes-256-cbc" | "aes256" => Ok(KeyCipher::Aes256Cbc),
            other => Err(CryptoError::Encrypt(format!("unsupported cipher {other}"))),
        }
    }
}

/// Encode a PKCS#8 private key as an unencrypted `PRIVATE KEY` block.
pub fn encode_private_key(key_der: &[u8]) -> Result<Zeroizing<String>> {
    pem::encode(pem::PRIVATE_KEY, key_der).map(Zeroizing::new)
}

/// Seal a PKCS#8 private key under `secret` as an `ENCRYPTED PRIVATE KEY` block.
pub fn seal_private_key(key_der: &[u8], secret: &Secret, cipher: KeyCipher) -> Result<String> {
    let info =
        PrivateKeyInfo::try_from(key_der).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let salt: [u8; SALT_LEN] = rng::random_array();
    let iv: [u8; IV_LEN] = rng::random_array();
    let params = cipher
        .parameters(&salt, &iv)
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    let sealed = info
        .encrypt_with_params(params, secret.as_bytes())
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;
    pem::encode(pem::ENCRYPTED_PRIVATE_KEY, sealed.as_bytes())
}

/// Open a private key block, decrypting it with `secret` when it is sealed.
///
/// Exactly one PEM block is accepted. An unencrypted `PRIVATE KEY` block is
/// returned as is and the secret is ignored.
pub fn open_private_key(key_pem: &[u8], secret: Option<&Secret>) -> Result<Zeroizing<Vec<u8>>> {
    let (label, der) = pem::decode_single(key_pem).map_err(|e| match e {
        CryptoError::TrailingData(_) => CryptoError::TrailingData("in the key"),
        other => other,
    })?;
    let der = Zeroizing::new(der);

    match label.as_str() {
        pem::PRIVATE_KEY => Ok(der),
        pem::ENCRYPTED_PRIVATE_KEY => {
            let secret = secret.ok_or_else(|| {
                CryptoError::Decrypt("key is encrypted but no secret is configured".into())
            })?;
            decrypt(&der, secret)
        }
        other => Err(CryptoError::Pem(format!("unexpected key block {other}"))),
    }
}

/// Whether a key block is sealed, without decrypting it.
pub fn is_sealed(key_pem: &[u8]) -> Result<bool> {
    let (label, _) = pem::decode_single(key_pem)?;
    Ok(label == pem::ENCRYPTED_PRIVATE_KEY)
}

fn decrypt(der: &[u8], secret: &Secret) -> Result<Zeroizing<Vec<u8>>> {
    let info = EncryptedPrivateKeyInfo::try_from(der)
        .map_err(|e| CryptoError::Pem(format!("malformed encrypted key: {e}")))?;

    let plain = info.decrypt(secret.as_bytes()).map_err(decrypt_error)?;

    // CBC padding alone can accept a wrong password; the plaintext must also
    // parse as a key.
    PrivateKeyInfo::try_from(plain.as_bytes()).map_err(|_| incorrect_password())?;

    Ok(Zeroizing::new(plain.as_bytes().to_vec()))
}

fn incorrect_password() -> CryptoError {
    CryptoError::Decrypt("incorrect password".into())
}

/// A wrong secret surfaces as a bad CBC pad (reported by pkcs5 as
/// `EncryptFailed`) or as plaintext that is not DER. Only parameter problems
/// keep their own cause.
fn decrypt_error(err: pkcs8::Error) -> CryptoError {
    use pkcs8::pkcs5::Error as Pbes;
    match err {
        pkcs8::Error::EncryptedPrivateKey(Pbes::DecryptFailed | Pbes::EncryptFailed)
        | pkcs8::Error::Asn1(_)
        | pkcs8::Error::KeyMalformed => incorrect_password(),
        other => CryptoError::Decrypt(other.to_string()),
    }
}
