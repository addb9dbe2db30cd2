use serde::{Deserialize, Serialize};

/// Attribute set captured once from a media file when its record is created.
///
/// Never mutated afterwards; a replacement brings a new record with its own set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaAttributes {
    pub video_codec: String,
    pub width: i32,
    pub height: i32,
    pub duration_ms: i64,
    pub video_bitrate: i64,
    pub aspect_ratio_mode: String,
    pub aspect_ratio: f64,
    pub frame_rate_mode: String,
    pub frame_rate: f64,
    pub scan_type: String,

    pub audio_codec: String,
    pub audio_duration_ms: i64,
    pub bitrate_mode: String,
    pub audio_bitrate: i64,
    pub compression_mode: String,
    pub channel_positions: String,
    pub sampling_rate: i32,
}
