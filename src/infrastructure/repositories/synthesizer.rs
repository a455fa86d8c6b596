use async_trait::async_trait;

/// Markers that identify an authentication or rate-limit failure in a provider message
const AUTH_OR_RATE_LIMIT_MARKERS: &[&str] = &[
    "401",
    "429",
    "token",
    "unauthorized",
    "rate limit",
    "rate_limit",
    "invalid_api_key",
    "insufficient_quota",
];

/// Everything the remote service needs to synthesize one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub credential: String,
    pub speed: f32,
}

impl SynthesisRequest {
    /// Key identifying the produced audio; the credential does not change the output
    pub fn cache_key(&self) -> String {
        format!("{}|{:.2}|{}", self.voice, self.speed, self.text)
    }
}

/// Why a remote synthesis call failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteFailure {
    #[error("{0}")]
    AuthOrRateLimit(String),
    #[error("{0}")]
    Other(String),
}

impl RemoteFailure {
    /// Classify a provider error message
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();

        if AUTH_OR_RATE_LIMIT_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            RemoteFailure::AuthOrRateLimit(message)
        } else {
            RemoteFailure::Other(message)
        }
    }

    pub fn is_auth_or_rate_limit(&self) -> bool {
        matches!(self, RemoteFailure::AuthOrRateLimit(_))
    }

    pub fn message(&self) -> &str {
        match self {
            RemoteFailure::AuthOrRateLimit(message) | RemoteFailure::Other(message) => message,
        }
    }
}

/// Remote text-to-speech operation.
///
/// Implementations take one chunk of text and return the encoded audio
/// (MP3 for the bundled provider). Latency is unbounded; callers race the
/// call against their own cancellation.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, RemoteFailure>;
}
