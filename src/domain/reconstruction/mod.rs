pub mod merge;
pub mod subtitles;

pub use merge::{is_ready_to_merge, MergedArtifact, Reconstructor};
pub use subtitles::{format_timestamp, generate_subtitles};
