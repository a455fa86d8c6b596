use crate::domain::jobs::Job;

/// Estimated speaking rate at speed 1.0
const CHARS_PER_SECOND: f64 = 18.0;

/// Silence inserted after every estimated entry
const PAUSE_SECONDS: f64 = 0.3;

/// Format seconds as `HH:MM:SS,mmm`, truncated to the millisecond
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).floor() as u64;

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Build an SRT document from the finished jobs, in queue order.
///
/// Jobs imported with a timestamp keep it verbatim. Others get a window
/// estimated from their length and `speed`, laid end to end with a short pause.
pub fn generate_subtitles(jobs: &[Job], speed: f32) -> String {
    let rate = CHARS_PER_SECOND * f64::from(speed);
    let mut cursor = 0.0_f64;

    jobs.iter()
        .filter(|job| job.is_finished())
        .enumerate()
        .map(|(index, job)| {
            let timestamp = match &job.source_timestamp {
                Some(timestamp) => timestamp.clone(),
                None => {
                    let duration = job.text.chars().count() as f64 / rate;
                    let start = cursor;
                    let end = start + duration;
                    cursor = end + PAUSE_SECONDS;
                    format!("{} --> {}", format_timestamp(start), format_timestamp(end))
                }
            };

            format!("{}\n{}\n{}\n", index + 1, timestamp, job.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
