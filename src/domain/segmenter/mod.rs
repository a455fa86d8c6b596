pub mod error;
pub mod service;

pub use error::SegmentError;
pub use service::{segment, TextSegmenter};
