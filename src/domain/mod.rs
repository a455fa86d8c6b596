pub mod credentials;
pub mod engine;
pub mod jobs;
pub mod reconstruction;
pub mod segmenter;
