//! Ephemeral certificate authority.
//!
//! Mints a fresh self-signed certificate for every bootstrap. The same
//! certificate acts as the CA the server trusts for client authentication and
//! as the leaf the client presents, so it carries both CA and leaf usages.
//!
//! # Security Design
//!
//! - **Key**: ECDSA P-384, generated per call, never reused
//! - **Serial**: 128 random bits
//! - **Validity**: `now .. now + validity`, callers pass the bootstrap window

use crate::{pem, rng, CryptoError, Result};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose, SerialNumber,
};
use std::time::Duration;
use time::OffsetDateTime;
use x509_parser::prelude::{parse_x509_certificate, X509Certificate};
use zeroize::Zeroizing;

/// Length of the random serial number in bytes.
pub const SERIAL_LEN: usize = 16;

/// A freshly minted self-signed certificate and its private key.
pub struct EphemeralCertificate {
    cert_der: Vec<u8>,
    key_der: Zeroizing<Vec<u8>>,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub serial: [u8; SERIAL_LEN],
}

impl EphemeralCertificate {
    /// DER-encoded X.509 certificate.
    pub fn cert_der(&self) -> &[u8] {
        &self.cert_der
    }

    /// PKCS#8 DER-encoded private key.
    pub fn key_der(&self) -> &[u8] {
        &self.key_der
    }

    /// PEM-encoded certificate.
    pub fn cert_pem(&self) -> Result<String> {
        pem::encode(pem::CERTIFICATE, &self.cert_der)
    }

    /// PEM-encoded, unencrypted PKCS#8 private key.
    pub fn key_pem(&self) -> Result<Zeroizing<String>> {
        pem::encode(pem::PRIVATE_KEY, &self.key_der).map(Zeroizing::new)
    }

    /// SHA-256 fingerprint of the certificate, for logs.
    pub fn fingerprint(&self) -> String {
        cert_fingerprint(&self.cert_der)
    }
}

impl std::fmt::Debug for EphemeralCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralCertificate")
            .field("fingerprint", &self.fingerprint())
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("serial", &hex::encode(self.serial))
            .finish_non_exhaustive()
    }
}

/// Generate a self-signed certificate valid for `validity` starting now.
pub fn make_certificate(validity: Duration) -> Result<EphemeralCertificate> {
    if validity.is_zero() {
        return Err(CryptoError::Pki("validity must be positive".into()));
    }
    let span = time::Duration::try_from(validity)
        .map_err(|e| CryptoError::Pki(format!("validity out of range: {e}")))?;

    let key = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P384_SHA384)
        .map_err(|e| CryptoError::KeyGen(e.to_string()))?;

    let serial: [u8; SERIAL_LEN] = rng::random_array();
    let not_before = OffsetDateTime::now_utc();
    let not_after = not_before
        .checked_add(span)
        .ok_or_else(|| CryptoError::Pki("validity out of range".into()))?;

    let mut params = CertificateParams::default();
    params.distinguished_name = DistinguishedName::new();
    params.serial_number = Some(SerialNumber::from_slice(&serial));
    params.not_before = not_before;
    params.not_after = not_after;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::Any];

    let cert = params.self_signed(&key)?;
    let cert_der = cert.der().to_vec();
    if cert_der.is_empty() {
        return Err(CryptoError::Pki("no certificates present".into()));
    }

    Ok(EphemeralCertificate {
        cert_der,
        key_der: Zeroizing::new(key.serialize_der()),
        not_before,
        not_after,
        serial,
    })
}

/// Check that a PKCS#8 private key belongs to the certificate's public key.
pub fn ensure_key_matches(cert_der: &[u8], key_der: &[u8]) -> Result<()> {
    let cert = parse(cert_der)?;
    let key = KeyPair::try_from(key_der).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let cert_public = cert.public_key().subject_public_key.data.as_ref();
    if cert_public != key.public_key_raw() {
        return Err(CryptoError::InvalidKey(
            "private key does not match certificate public key".into(),
        ));
    }
    Ok(())
}

/// Validity window of a certificate as unix timestamps `(not_before, not_after)`.
pub fn validity_window(cert_der: &[u8]) -> Result<(i64, i64)> {
    let cert = parse(cert_der)?;
    let validity = cert.validity();
    Ok((validity.not_before.timestamp(), validity.not_after.timestamp()))
}

/// Certificate fingerprint (SHA-256, hex).
pub fn cert_fingerprint(der: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    hex::encode(Sha256::digest(der))
}

fn parse(cert_der: &[u8]) -> Result<X509Certificate<'_>> {
    let (rest, cert) =
        parse_x509_certificate(cert_der).map_err(|e| CryptoError::Certificate(e.to_string()))?;
    if !rest.is_empty() {
        return Err(CryptoError::Certificate(
            "trailing bytes after certificate".into(),
        ));
    }
    Ok(cert)
}
