use crate::domain::credentials::TaskCategory;
use crate::domain::engine::EngineSettings;
use crate::error::{AppError, AppResult};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Newline separated credential blob
    pub credentials: String,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub task_category: TaskCategory,
    pub voice: String,
    pub speed: f32,
    pub max_chars: usize,
    pub min_chars_to_merge: usize,
    pub concurrent_threads: usize,
    pub request_delay_ms: u64,
    pub model: String,
    pub environment: Environment,
    pub log_format: LogFormat,
    // TTS Cache
    pub tts_cache_enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = match lookup("TAPE_CREDENTIALS") {
            Some(blob) => blob,
            None => match lookup("TAPE_CREDENTIALS_FILE") {
                Some(path) => std::fs::read_to_string(&path).map_err(|e| {
                    AppError::Config(format!("cannot read credentials file {}: {}", path, e))
                })?,
                None => String::new(),
            },
        };

        let config = Config {
            credentials,
            input_path: lookup("TAPE_INPUT")
                .map(PathBuf::from)
                .ok_or_else(|| AppError::Config("TAPE_INPUT must be set".to_string()))?,
            output_dir: PathBuf::from(lookup("TAPE_OUTPUT_DIR").unwrap_or_else(|| "out".to_string())),
            task_category: parse_or(&lookup, "TAPE_TASK_CATEGORY", TaskCategory::Speech)?,
            voice: lookup("TAPE_VOICE").unwrap_or_else(|| "alloy".to_string()),
            speed: parse_or(&lookup, "TAPE_SPEED", 1.0)?,
            max_chars: parse_or(&lookup, "TAPE_MAX_CHARS", 1500)?,
            min_chars_to_merge: parse_or(&lookup, "TAPE_MIN_CHARS_TO_MERGE", 30)?,
            concurrent_threads: parse_or(&lookup, "TAPE_CONCURRENT_THREADS", 3)?,
            request_delay_ms: parse_or(&lookup, "TAPE_REQUEST_DELAY_MS", 500)?,
            model: lookup("TAPE_MODEL").unwrap_or_else(|| "tts-1".to_string()),
            environment: match lookup("ENVIRONMENT").unwrap_or_default().as_str() {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match lookup("LOG_FORMAT").unwrap_or_default().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            tts_cache_enabled: lookup("TTS_CACHE_ENABLED")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
        };

        Ok(config)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            task_category: self.task_category,
            voice: self.voice.clone(),
            speed: self.speed,
            concurrent_threads: self.concurrent_threads,
            request_delay: Duration::from_millis(self.request_delay_ms),
            max_chars: self.max_chars,
            min_chars_to_merge: self.min_chars_to_merge,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> &'static str {
        if self.is_development() {
            "tape_batch=debug"
        } else {
            "tape_batch=info"
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("invalid {}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
