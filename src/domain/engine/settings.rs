use super::error::EngineError;
use crate::domain::credentials::TaskCategory;
use std::time::Duration;

/// Upper bound on concurrent synthesis workers
pub const MAX_CONCURRENT_THREADS: usize = 10;

/// Knobs for segmentation and for the worker protocol
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub task_category: TaskCategory,
    pub voice: String,
    pub speed: f32,
    pub concurrent_threads: usize,
    /// Pause a worker takes after each job before claiming the next
    pub request_delay: Duration,
    pub max_chars: usize,
    pub min_chars_to_merge: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            task_category: TaskCategory::Speech,
            voice: "alloy".to_string(),
            speed: 1.0,
            concurrent_threads: 3,
            request_delay: Duration::from_millis(500),
            max_chars: 1500,
            min_chars_to_merge: 30,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(EngineError::InvalidSettings(format!(
                "speed must be a positive number, got {}",
                self.speed
            )));
        }

        if self.max_chars == 0 {
            return Err(EngineError::InvalidSettings(
                "max_chars must be a positive number".to_string(),
            ));
        }

        Ok(())
    }

    /// Worker count clamped to `1..=MAX_CONCURRENT_THREADS`
    pub fn worker_count(&self) -> usize {
        self.concurrent_threads.clamp(1, MAX_CONCURRENT_THREADS)
    }
}
