//! rustls plumbing shared by both ends of the bootstrap.
//!
//! Neither side uses web PKI. The server pins the one certificate it minted
//! for this connection; the client hands the server's chain to a
//! caller-supplied [`PeerVerifier`]. Handshake signatures are always checked
//! against the presented certificate.

use crate::identity::Identity;
use crate::BootstrapError;
use ephtls_crypto::pki;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{
    CertificateError, DigitallySignedStruct, DistinguishedName, SignatureScheme,
    SupportedProtocolVersion,
};
use std::fmt;
use std::sync::Arc;

/// TLS 1.3 preferred, TLS 1.2 accepted.
pub static PROTOCOL_VERSIONS: &[&SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Decides whether the client trusts the server's certificate chain.
///
/// The chain is end-entity first. Return an error to abort the handshake.
pub trait PeerVerifier: fmt::Debug + Send + Sync {
    fn verify_peer(&self, chain: &[CertificateDer<'_>]) -> Result<(), rustls::Error>;
}

/// Trust whatever certificate the server presents.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAny;

impl PeerVerifier for AcceptAny {
    fn verify_peer(&self, _chain: &[CertificateDer<'_>]) -> Result<(), rustls::Error> {
        Ok(())
    }
}

/// Trust only a server whose end-entity certificate has this SHA-256 fingerprint.
#[derive(Debug, Clone)]
pub struct PinnedFingerprint(String);

impl PinnedFingerprint {
    pub fn new(hex_sha256: impl Into<String>) -> Self {
        Self(hex_sha256.into().to_ascii_lowercase().replace(':', ""))
    }
}

impl PeerVerifier for PinnedFingerprint {
    fn verify_peer(&self, chain: &[CertificateDer<'_>]) -> Result<(), rustls::Error> {
        let leaf = chain
            .first()
            .ok_or(rustls::Error::NoCertificatesPresented)?;
        if pki::cert_fingerprint(leaf) == self.0 {
            Ok(())
        } else {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }
}

/// Accepts exactly one client certificate while it is inside its validity window.
#[derive(Debug)]
pub(crate) struct PinnedClientVerifier {
    pinned: CertificateDer<'static>,
    not_before: i64,
    not_after: i64,
    provider: Arc<CryptoProvider>,
}

impl PinnedClientVerifier {
    pub(crate) fn new(
        cert_der: &[u8],
        provider: Arc<CryptoProvider>,
    ) -> Result<Self, BootstrapError> {
        let (not_before, not_after) = pki::validity_window(cert_der)?;
        Ok(Self {
            pinned: CertificateDer::from(cert_der.to_vec()),
            not_before,
            not_after,
            provider,
        })
    }
}

impl ClientCertVerifier for PinnedClientVerifier {
    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &[]
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        if end_entity.as_ref() != self.pinned.as_ref() {
            return Err(rustls::Error::InvalidCertificate(
                CertificateError::UnknownIssuer,
            ));
        }
        let now = now.as_secs() as i64;
        if now < self.not_before {
            return Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidYet,
            ));
        }
        if now > self.not_after {
            return Err(rustls::Error::InvalidCertificate(CertificateError::Expired));
        }
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Hands the server chain to a [`PeerVerifier`].
#[derive(Debug)]
pub(crate) struct DelegatingServerVerifier {
    peer: Arc<dyn PeerVerifier>,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for DelegatingServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let mut chain = Vec::with_capacity(1 + intermediates.len());
        chain.push(end_entity.clone());
        chain.extend(intermediates.iter().cloned());
        self.peer.verify_peer(&chain)?;
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Server side: present `identity`, require the pinned ephemeral client certificate.
pub(crate) fn server_config(
    provider: Arc<CryptoProvider>,
    identity: &Identity,
    client_cert_der: &[u8],
) -> Result<rustls::ServerConfig, BootstrapError> {
    let verifier = PinnedClientVerifier::new(client_cert_der, provider.clone())?;
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(PROTOCOL_VERSIONS)?
        .with_client_cert_verifier(Arc::new(verifier))
        .with_single_cert(identity.cert_chain(), identity.private_key())?;
    Ok(config)
}

/// Client side: present the received ephemeral identity, let `peer` judge the server.
pub(crate) fn client_config(
    provider: Arc<CryptoProvider>,
    identity: &Identity,
    peer: Arc<dyn PeerVerifier>,
) -> Result<rustls::ClientConfig, BootstrapError> {
    let verifier = DelegatingServerVerifier {
        peer,
        provider: provider.clone(),
    };
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(PROTOCOL_VERSIONS)?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_client_auth_cert(identity.cert_chain(), identity.private_key())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cert() -> CertificateDer<'static> {
        Identity::generate(Duration::from_secs(60))
            .unwrap()
            .certificate()
            .clone()
    }

    fn now() -> UnixTime {
        UnixTime::now()
    }

    #[test]
    fn pinned_client_verifier_accepts_only_its_certificate() {
        let pinned = cert();
        let verifier = PinnedClientVerifier::new(&pinned, crypto_provider()).unwrap();

        assert!(verifier.verify_client_cert(&pinned, &[], now()).is_ok());
        let err = verifier.verify_client_cert(&cert(), &[], now()).unwrap_err();
        assert_eq!(
            err,
            rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer)
        );
    }

    #[test]
    fn pinned_client_verifier_checks_window() {
        let pinned = cert();
        let verifier = PinnedClientVerifier::new(&pinned, crypto_provider()).unwrap();

        let later = UnixTime::since_unix_epoch(Duration::from_secs(
            (verifier.not_after + 1) as u64,
        ));
        assert_eq!(
            verifier.verify_client_cert(&pinned, &[], later).unwrap_err(),
            rustls::Error::InvalidCertificate(CertificateError::Expired)
        );

        let earlier = UnixTime::since_unix_epoch(Duration::from_secs(
            (verifier.not_before - 1) as u64,
        ));
        assert_eq!(
            verifier.verify_client_cert(&pinned, &[], earlier).unwrap_err(),
            rustls::Error::InvalidCertificate(CertificateError::NotValidYet)
        );
    }

    #[test]
    fn client_verifier_offers_no_hints() {
        let verifier = PinnedClientVerifier::new(&cert(), crypto_provider()).unwrap();
        assert!(verifier.root_hint_subjects().is_empty());
        assert!(verifier.client_auth_mandatory());
        assert!(!verifier.supported_verify_schemes().is_empty());
    }

    #[test]
    fn fingerprint_pin() {
        let identity = Identity::generate(Duration::from_secs(60)).unwrap();
        let chain = identity.cert_chain();

        let upper = identity.fingerprint().to_ascii_uppercase();
        assert!(PinnedFingerprint::new(upper).verify_peer(&chain).is_ok());
        assert!(PinnedFingerprint::new("00").verify_peer(&chain).is_err());
        assert_eq!(
            PinnedFingerprint::new("00").verify_peer(&[]).unwrap_err(),
            rustls::Error::NoCertificatesPresented
        );
    }

    #[test]
    fn delegating_verifier_passes_whole_chain() {
        #[derive(Debug)]
        struct ExpectTwo;
        impl PeerVerifier for ExpectTwo {
            fn verify_peer(&self, chain: &[CertificateDer<'_>]) -> Result<(), rustls::Error> {
                if chain.len() == 2 {
                    Ok(())
                } else {
                    Err(rustls::Error::General(format!("{} certs", chain.len())))
                }
            }
        }

        let verifier = DelegatingServerVerifier {
            peer: Arc::new(ExpectTwo),
            provider: crypto_provider(),
        };
        let name = ServerName::try_from("localhost").unwrap();
        let leaf = cert();
        assert!(verifier
            .verify_server_cert(&leaf, &[cert()], &name, &[], now())
            .is_ok());
        assert!(verifier
            .verify_server_cert(&leaf, &[], &name, &[], now())
            .is_err());
    }

    #[test]
    fn configs_build_for_both_sides() {
        let server_identity = Identity::generate(Duration::from_secs(60)).unwrap();
        let ephemeral = Identity::generate(Duration::from_secs(30)).unwrap();

        server_config(crypto_provider(), &server_identity, ephemeral.certificate()).unwrap();
        client_config(crypto_provider(), &ephemeral, Arc::new(AcceptAny)).unwrap();
    }
}
