//! ffprobe-based attribute extraction

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use mediagate_core::{AppError, MediaAttributes};
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

use crate::traits::MetadataExtractor;

const LOSSLESS_AUDIO_CODECS: [&str; 4] = ["flac", "alac", "wavpack", "truehd"];

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
    duration: Option<String>,
    bit_rate: Option<String>,
    display_aspect_ratio: Option<String>,
    sample_aspect_ratio: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    field_order: Option<String>,
    sample_rate: Option<String>,
    channel_layout: Option<String>,
    channels: Option<i32>,
}

fn seconds_to_ms(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|d| d.parse::<f64>().ok())
        .map(|secs| (secs * 1000.0).round() as i64)
}

fn parse_i64(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.parse::<i64>().ok())
}

/// Parse "num/den" or "num:den" into a float.
fn parse_ratio(value: Option<&str>, sep: char) -> Option<f64> {
    let (num, den) = value?.split_once(sep)?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den != 0.0 {
        Some(num / den)
    } else {
        None
    }
}

fn scan_type(field_order: Option<&str>) -> String {
    match field_order {
        Some("progressive") => "Progressive".to_string(),
        Some("tt") | Some("bb") | Some("tb") | Some("bt") => "Interlaced".to_string(),
        _ => String::new(),
    }
}

/// Build the attribute set from raw `ffprobe -show_format -show_streams` JSON.
///
/// The first video stream and the first audio stream are used; a file with
/// neither is rejected.
pub fn parse_probe_output(stdout: &[u8]) -> Result<MediaAttributes> {
    let probe: FfprobeOutput =
        serde_json::from_slice(stdout).context("Failed to parse ffprobe output")?;

    let find = |kind: &str| {
        probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
    };
    let video = find("video");
    let audio = find("audio");
    if video.is_none() && audio.is_none() {
        return Err(anyhow!("No audio or video stream found"));
    }

    let format_duration = probe.format.as_ref().and_then(|f| f.duration.as_deref());
    let format_bitrate = probe.format.as_ref().and_then(|f| f.bit_rate.as_deref());

    let mut attributes = MediaAttributes::default();

    if let Some(v) = video {
        attributes.video_codec = v.codec_name.clone().unwrap_or_default();
        attributes.width = v.width.unwrap_or_default();
        attributes.height = v.height.unwrap_or_default();
        attributes.duration_ms = seconds_to_ms(v.duration.as_deref().or(format_duration))
            .unwrap_or_default();
        attributes.video_bitrate = parse_i64(v.bit_rate.as_deref())
            .or_else(|| parse_i64(format_bitrate))
            .unwrap_or_default();

        attributes.aspect_ratio_mode = v.display_aspect_ratio.clone().unwrap_or_default();
        attributes.aspect_ratio = parse_ratio(v.display_aspect_ratio.as_deref(), ':')
            .or_else(|| {
                let sar = parse_ratio(v.sample_aspect_ratio.as_deref(), ':').unwrap_or(1.0);
                match (v.width, v.height) {
                    (Some(w), Some(h)) if h > 0 => Some(w as f64 * sar / h as f64),
                    _ => None,
                }
            })
            .unwrap_or_default();

        let average = parse_ratio(v.avg_frame_rate.as_deref(), '/');
        let nominal = parse_ratio(v.r_frame_rate.as_deref(), '/');
        attributes.frame_rate = average.or(nominal).unwrap_or_default();
        attributes.frame_rate_mode = match (average, nominal) {
            (Some(a), Some(n)) if (a - n).abs() > 0.01 => "VFR".to_string(),
            (Some(_), _) | (_, Some(_)) => "CFR".to_string(),
            _ => String::new(),
        };
        attributes.scan_type = scan_type(v.field_order.as_deref());
    } else {
        attributes.duration_ms = seconds_to_ms(format_duration).unwrap_or_default();
    }

    if let Some(a) = audio {
        let codec = a.codec_name.clone().unwrap_or_default();
        let lossless = codec.starts_with("pcm_") || LOSSLESS_AUDIO_CODECS.contains(&codec.as_str());

        attributes.audio_duration_ms = seconds_to_ms(a.duration.as_deref().or(format_duration))
            .unwrap_or_default();
        attributes.audio_bitrate = parse_i64(a.bit_rate.as_deref()).unwrap_or_default();
        // ffprobe reports a per-stream bit rate only for constant bit rate audio
        attributes.bitrate_mode = if a.bit_rate.is_some() && !lossless {
            "CBR".to_string()
        } else {
            "VBR".to_string()
        };
        attributes.compression_mode = if lossless { "Lossless" } else { "Lossy" }.to_string();
        attributes.channel_positions = a
            .channel_layout
            .clone()
            .or_else(|| a.channels.map(|c| format!("{} channels", c)))
            .unwrap_or_default();
        attributes.sampling_rate = a
            .sample_rate
            .as_deref()
            .and_then(|sr| sr.parse::<i32>().ok())
            .unwrap_or_default();
        attributes.audio_codec = codec;
    }

    Ok(attributes)
}

/// Validate that a path doesn't contain shell metacharacters
fn validate_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }
    Ok(())
}

/// Runs the `ffprobe` executable against stored files.
pub struct FfprobeExtractor {
    ffprobe_path: String,
}

impl FfprobeExtractor {
    pub fn new(ffprobe_path: impl Into<String>) -> Result<Self> {
        let ffprobe_path = ffprobe_path.into();
        validate_path(&ffprobe_path)
            .context("Invalid ffprobe_path: contains dangerous characters")?;

        if !ffprobe_path.chars().all(|c| {
            c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.' || c == '\\'
        }) {
            return Err(anyhow!("Invalid ffprobe_path: contains unsafe characters"));
        }

        Ok(Self { ffprobe_path })
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path
    ))]
    async fn probe(&self, path: &Path) -> Result<MediaAttributes> {
        let start = std::time::Instant::now();

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let attributes = parse_probe_output(&output.stdout)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            media_duration_ms = attributes.duration_ms,
            width = attributes.width,
            height = attributes.height,
            codec = %attributes.video_codec,
            "Media probe completed"
        );

        Ok(attributes)
    }
}

#[async_trait]
impl MetadataExtractor for FfprobeExtractor {
    async fn extract(&self, path: &Path) -> Result<MediaAttributes, AppError> {
        self.probe(path).await.map_err(|e| {
            tracing::warn!(error = %e, path = %path.display(), "Media probe failed");
            AppError::Metadata(format!("{:#}", e))
        })
    }
}
