//! Derivation of prosody features from a finished voice recording.

use kindred_types::models::AudioFeatures;

/// Words per minute, rounded. Zero for an empty recording.
pub fn calculate_pace(transcript: &str, duration_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 0.0;
    }
    let words = transcript.split_whitespace().count() as f64;
    (words / duration_secs * 60.0).round()
}

/// Sentence breaks (`.`, `!` or `?` followed by whitespace) stand in for pauses.
pub fn count_pauses(transcript: &str) -> u32 {
    let mut count = 0;
    let mut chars = transcript.chars().peekable();
    while let Some(c) = chars.next() {
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            count += 1;
        }
    }
    count
}

pub fn extract_audio_features(transcript: &str, duration_secs: f64, average_volume: f64) -> AudioFeatures {
    let volume = if average_volume.is_nan() { 0.0 } else { average_volume.clamp(0.0, 1.0) };
    AudioFeatures {
        volume,
        pace: calculate_pace(transcript, duration_secs),
        pause_count: count_pauses(transcript),
    }
}

/// Volume is not measured server-side; longer transcripts stand in for a
/// louder, more sustained recording.
pub fn estimate_volume(transcript: &str) -> f64 {
    (transcript.chars().count() as f64 / 100.0).min(1.0)
}
