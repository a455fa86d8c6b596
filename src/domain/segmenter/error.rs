#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    #[error("max_chars must be a positive number")]
    InvalidMaxChars,
}
