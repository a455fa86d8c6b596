pub mod audio_store;
pub mod openai_synthesizer;
pub mod synthesizer;

pub use audio_store::{AudioStore, InMemoryAudioStore, StoreError};
pub use openai_synthesizer::OpenAiSynthesizer;
pub use synthesizer::{RemoteFailure, SynthesisRequest, Synthesizer};
