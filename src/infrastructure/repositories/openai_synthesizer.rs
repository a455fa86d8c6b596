use super::synthesizer::{RemoteFailure, SynthesisRequest, Synthesizer};
use async_openai::{
    config::OpenAIConfig,
    types::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Speed range accepted by the OpenAI speech endpoint
const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;

/// OpenAI text-to-speech provider.
///
/// The credential travels with every request, so one client is kept per API key.
pub struct OpenAiSynthesizer {
    model: String,
    clients: Mutex<HashMap<String, Arc<Client<OpenAIConfig>>>>,
}

impl OpenAiSynthesizer {
    pub fn new(model: String) -> Self {
        Self {
            model,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, credential: &str) -> Arc<Client<OpenAIConfig>> {
        let mut clients = self.clients.lock();
        clients
            .entry(credential.to_string())
            .or_insert_with(|| {
                Arc::new(Client::with_config(
                    OpenAIConfig::new().with_api_key(credential),
                ))
            })
            .clone()
    }

    fn speech_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }
}

/// Map a voice name onto the provider's voices, defaulting to alloy
fn parse_voice(voice: &str) -> Voice {
    match voice.to_lowercase().as_str() {
        "alloy" => Voice::Alloy,
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "nova" => Voice::Nova,
        "shimmer" => Voice::Shimmer,
        _ => Voice::Alloy,
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, RemoteFailure> {
        if request.credential.is_empty() {
            return Err(RemoteFailure::AuthOrRateLimit(
                "OpenAI TTS error: missing API token".to_string(),
            ));
        }

        let start_time = std::time::Instant::now();
        let client = self.client_for(&request.credential);

        tracing::info!(
            model = %self.model,
            voice = %request.voice,
            speed = request.speed,
            text_length = request.text.len(),
            "Calling OpenAI TTS API"
        );

        let speech = CreateSpeechRequest {
            model: self.speech_model(),
            input: request.text.clone(),
            voice: parse_voice(&request.voice),
            response_format: None, // Defaults to MP3
            speed: Some(request.speed.clamp(MIN_SPEED, MAX_SPEED)),
        };

        let response = client.audio().speech(speech).await.map_err(|e| {
            tracing::error!(
                error = %e,
                model = %self.model,
                voice = %request.voice,
                text_length = request.text.len(),
                "OpenAI TTS API call failed"
            );
            // the debug form carries the provider error code
            RemoteFailure::classify(format!("OpenAI TTS error: {} ({:?})", e, e))
        })?;

        let audio_bytes = response.bytes.to_vec();

        tracing::debug!(
            provider = "openai",
            latency_ms = start_time.elapsed().as_millis(),
            audio_size_bytes = audio_bytes.len(),
            "OpenAI TTS audio received successfully"
        );

        Ok(audio_bytes)
    }
}
