use crate::domain::jobs::AudioRef;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("audio {0} is not available")]
    Missing(AudioRef),
    #[error("audio store failure: {0}")]
    Backend(String),
}

/// Holds synthesized audio behind opaque references.
///
/// Released references stop resolving; releasing twice is harmless.
#[async_trait]
pub trait AudioStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>) -> Result<AudioRef, StoreError>;

    async fn fetch(&self, audio_ref: &AudioRef) -> Result<Vec<u8>, StoreError>;

    async fn release(&self, audio_ref: &AudioRef);
}

/// Process-local audio store
#[derive(Debug, Default)]
pub struct InMemoryAudioStore {
    entries: RwLock<HashMap<AudioRef, Arc<Vec<u8>>>>,
}

impl InMemoryAudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Total bytes currently held
    pub async fn total_bytes(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .map(|bytes| bytes.len())
            .sum()
    }
}

#[async_trait]
impl AudioStore for InMemoryAudioStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<AudioRef, StoreError> {
        let audio_ref = AudioRef::new();
        let size = bytes.len();
        self.entries.write().await.insert(audio_ref, Arc::new(bytes));

        tracing::debug!(audio_ref = %audio_ref, audio_size = size, "Audio stored");
        Ok(audio_ref)
    }

    async fn fetch(&self, audio_ref: &AudioRef) -> Result<Vec<u8>, StoreError> {
        self.entries
            .read()
            .await
            .get(audio_ref)
            .map(|bytes| bytes.as_ref().clone())
            .ok_or(StoreError::Missing(*audio_ref))
    }

    async fn release(&self, audio_ref: &AudioRef) {
        if self.entries.write().await.remove(audio_ref).is_some() {
            tracing::debug!(audio_ref = %audio_ref, "Audio released");
        }
    }
}
