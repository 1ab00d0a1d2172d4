//! Versioned envelope framing.

use super::registry::VersionRegistry;
use super::v1::{self, PayloadV1};
use super::{wire, ProtoError};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Decoded payload, one variant per protocol version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    V1(PayloadV1),
}

impl Payload {
    /// Version this payload shape belongs to.
    pub fn version(&self) -> u16 {
        match self {
            Payload::V1(_) => v1::VERSION,
        }
    }
}

/// A version id plus its payload. The first thing the server sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub version: u16,
    pub payload: Payload,
}

impl Envelope {
    pub fn v1(payload: PayloadV1) -> Self {
        Self {
            version: v1::VERSION,
            payload: Payload::V1(payload),
        }
    }

    /// Write the version and hand the payload to that version's codec.
    pub async fn write<W>(&self, registry: &VersionRegistry, writer: &mut W) -> Result<(), ProtoError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let codec = registry.codec(self.version)?;
        if self.payload.version() != self.version {
            return Err(ProtoError::PayloadMismatch {
                codec: self.version,
                payload: self.payload.version(),
            });
        }

        wire::write_u16(writer, self.version).await?;
        codec.write(&self.payload, writer).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read a version, then let the registered codec read the payload.
    pub async fn read<R>(registry: &VersionRegistry, reader: &mut R) -> Result<Self, ProtoError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let version = wire::read_u16(reader).await?;
        let codec = registry.codec(version)?;
        let payload = codec.read(reader).await?;
        if payload.version() != version {
            return Err(ProtoError::PayloadMismatch {
                codec: version,
                payload: payload.version(),
            });
        }
        Ok(Self { version, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{PayloadCodec, V1Codec};

    fn payload() -> PayloadV1 {
        PayloadV1 {
            certificate: b"cert".to_vec(),
            encrypted_key: b"key".to_vec(),
        }
    }

    #[tokio::test]
    async fn envelope_over_duplex() {
        let registry = VersionRegistry::standard();
        let (mut a, mut b) = tokio::io::duplex(1024);

        let sent = Envelope::v1(payload());
        sent.write(&registry, &mut a).await.unwrap();
        let received = Envelope::read(&registry, &mut b).await.unwrap();
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn version_prefix_comes_first() {
        let mut buf = Vec::new();
        Envelope::v1(payload())
            .write(&VersionRegistry::standard(), &mut buf)
            .await
            .unwrap();
        assert_eq!(&buf[..2], &[1, 0]);
    }

    #[tokio::test]
    async fn unknown_version_on_read() {
        let bytes: &[u8] = &[2, 0, 0, 0, 0, 0];
        let err = Envelope::read(&VersionRegistry::standard(), &mut &bytes[..])
            .await
            .unwrap_err();
        assert!(matches!(err, ProtoError::UnknownVersion(2)));
    }

    #[tokio::test]
    async fn unknown_version_on_write_sends_nothing() {
        let empty = VersionRegistry::builder().build();
        let mut buf = Vec::new();
        let err = Envelope::v1(payload())
            .write(&empty, &mut buf)
            .await
            .unwrap_err();
        assert!(matches!(err, ProtoError::UnknownVersion(1)));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn codec_registered_under_foreign_id() {
        let registry = VersionRegistry::builder()
            .register(9, V1Codec)
            .unwrap()
            .build();
        let mut buf = vec![9, 0];
        V1Codec
            .write(&Payload::V1(payload()), &mut buf)
            .await
            .unwrap();

        let err = Envelope::read(&registry, &mut buf.as_slice())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtoError::PayloadMismatch { codec: 9, payload: 1 }));
    }

    #[tokio::test]
    async fn missing_version_is_truncated() {
        let err = Envelope::read(&VersionRegistry::standard(), &mut &b"\x01"[..])
            .await
            .unwrap_err();
        assert!(matches!(err, ProtoError::Truncated { expected: 2 }));
    }
}
