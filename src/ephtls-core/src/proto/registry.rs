//! Version id to payload codec table.
//!
//! Built once, read-only afterwards. Servers and clients that should talk to
//! each other must be handed registries with the same entries.

use super::envelope::Payload;
use super::v1::{self, V1Codec};
use super::ProtoError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncRead, AsyncWrite};

/// Reads and writes the payload half of an envelope for one protocol version.
#[async_trait]
pub trait PayloadCodec: fmt::Debug + Send + Sync {
    async fn write(
        &self,
        payload: &Payload,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), ProtoError>;

    async fn read(&self, reader: &mut (dyn AsyncRead + Unpin + Send))
        -> Result<Payload, ProtoError>;
}

/// Collects codecs before freezing them into a [`VersionRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    codecs: BTreeMap<u16, Arc<dyn PayloadCodec>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a codec under `version`. Registering the same id twice fails.
    pub fn register<C>(mut self, version: u16, codec: C) -> Result<Self, ProtoError>
    where
        C: PayloadCodec + 'static,
    {
        if self.codecs.contains_key(&version) {
            return Err(ProtoError::DuplicateVersion(version));
        }
        self.codecs.insert(version, Arc::new(codec));
        Ok(self)
    }

    pub fn build(self) -> VersionRegistry {
        VersionRegistry {
            codecs: Arc::new(self.codecs),
        }
    }
}

/// Immutable table of known protocol versions. Cheap to clone.
#[derive(Debug, Clone)]
pub struct VersionRegistry {
    codecs: Arc<BTreeMap<u16, Arc<dyn PayloadCodec>>>,
}

impl VersionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry holding every version this crate ships.
    pub fn standard() -> Self {
        static STANDARD: OnceLock<VersionRegistry> = OnceLock::new();
        STANDARD
            .get_or_init(|| VersionRegistry {
                codecs: Arc::new(BTreeMap::from([(
                    v1::VERSION,
                    Arc::new(V1Codec) as Arc<dyn PayloadCodec>,
                )])),
            })
            .clone()
    }

    pub fn codec(&self, version: u16) -> Result<&dyn PayloadCodec, ProtoError> {
        self.codecs
            .get(&version)
            .map(|codec| codec.as_ref())
            .ok_or(ProtoError::UnknownVersion(version))
    }

    pub fn contains(&self, version: u16) -> bool {
        self.codecs.contains_key(&version)
    }

    /// Registered version ids in ascending order.
    pub fn versions(&self) -> Vec<u16> {
        self.codecs.keys().copied().collect()
    }
}

impl Default for VersionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
