//! Version 1 payload: PEM certificate plus PEM private key.
//!
//! Framed as a 4-byte little-endian length followed by exactly that many
//! bytes of postcard-encoded [`PayloadV1`].

use super::envelope::Payload;
use super::registry::PayloadCodec;
use super::{wire, ProtoError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

pub const VERSION: u16 = 1;

/// Ephemeral credentials handed from server to client.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadV1 {
    /// PEM `CERTIFICATE` block.
    pub certificate: Vec<u8>,
    /// PEM private key, `ENCRYPTED PRIVATE KEY` when a secret is configured.
    pub encrypted_key: Vec<u8>,
}

impl std::fmt::Debug for PayloadV1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadV1")
            .field("certificate_len", &self.certificate.len())
            .field("encrypted_key_len", &self.encrypted_key.len())
            .finish()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct V1Codec;

impl V1Codec {
    pub fn encode(payload: &PayloadV1) -> Result<Vec<u8>, ProtoError> {
        postcard::to_stdvec(payload).map_err(|e| ProtoError::Encode(e.to_string()))
    }

    /// Decode a full frame. Bytes left over after the object are an error.
    pub fn decode(frame: &[u8]) -> Result<PayloadV1, ProtoError> {
        let (payload, rest) = postcard::take_from_bytes::<PayloadV1>(frame)
            .map_err(|e| ProtoError::Decode(e.to_string()))?;
        if !rest.is_empty() {
            return Err(ProtoError::Decode(format!(
                "{} trailing bytes after payload",
                rest.len()
            )));
        }
        Ok(payload)
    }
}

#[async_trait]
impl PayloadCodec for V1Codec {
    async fn write(
        &self,
        payload: &Payload,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), ProtoError> {
        let Payload::V1(inner) = payload;
        let frame = Self::encode(inner)?;
        let len = u32::try_from(frame.len())
            .map_err(|_| ProtoError::Encode(format!("payload of {} bytes", frame.len())))?;

        wire::write_u32(writer, len).await?;
        wire::write_exact(writer, &frame).await
    }

    async fn read(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<Payload, ProtoError> {
        let len = wire::read_u32(reader).await?;
        let frame = wire::read_frame(reader, len as usize).await?;
        Self::decode(&frame).map(Payload::V1)
    }
}
