pub mod error;
pub mod service;
pub mod settings;

pub use error::{EngineError, EngineResult};
pub use service::{RunHandle, RunState, SynthesisEngine};
pub use settings::{EngineSettings, MAX_CONCURRENT_THREADS};
