//! Certificate plus private key, in the shape rustls wants them.

use crate::BootstrapError;
use ephtls_crypto::{keyseal, pem, pki, EphemeralCertificate, Secret};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::path::Path;
use std::time::Duration;
use zeroize::Zeroizing;

/// A TLS identity: one certificate and the PKCS#8 key that signs for it.
#[derive(Clone)]
pub struct Identity {
    cert: CertificateDer<'static>,
    key_der: Zeroizing<Vec<u8>>,
}

impl Identity {
    pub fn from_ephemeral(cert: &EphemeralCertificate) -> Self {
        Self {
            cert: CertificateDer::from(cert.cert_der().to_vec()),
            key_der: Zeroizing::new(cert.key_der().to_vec()),
        }
    }

    /// Build from DER parts, checking that the key belongs to the certificate.
    pub fn from_der(cert_der: Vec<u8>, key_der: Zeroizing<Vec<u8>>) -> Result<Self, BootstrapError> {
        pki::ensure_key_matches(&cert_der, &key_der)?;
        Ok(Self {
            cert: CertificateDer::from(cert_der),
            key_der,
        })
    }

    /// Build from a single PEM certificate and a PEM key, sealed or not.
    pub fn from_pem(
        cert_pem: &[u8],
        key_pem: &[u8],
        secret: Option<&Secret>,
    ) -> Result<Self, BootstrapError> {
        let cert_der = pem::decode_labeled(cert_pem, pem::CERTIFICATE)?;
        let key_der = keyseal::open_private_key(key_pem, secret)?;
        Self::from_der(cert_der, key_der)
    }

    /// Load a PEM certificate and an unencrypted PEM key from disk.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, BootstrapError> {
        let cert_pem = std::fs::read(cert_path)?;
        let key_pem = Zeroizing::new(std::fs::read(key_path)?);
        Self::from_pem(&cert_pem, &key_pem, None)
    }

    /// Fresh self-signed identity valid for `validity`.
    pub fn generate(validity: Duration) -> Result<Self, BootstrapError> {
        Ok(Self::from_ephemeral(&pki::make_certificate(validity)?))
    }

    pub fn certificate(&self) -> &CertificateDer<'static> {
        &self.cert
    }

    pub fn fingerprint(&self) -> String {
        pki::cert_fingerprint(&self.cert)
    }

    pub(crate) fn cert_chain(&self) -> Vec<CertificateDer<'static>> {
        vec![self.cert.clone()]
    }

    pub(crate) fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_der.to_vec()))
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}
