//! Video stream probing via `ffprobe`.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use blaster_common::error::{BlasterError, BlasterResult};
use serde::Deserialize;

/// Basic stream facts needed to decode and place a video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProbe {
    pub width: u32,
    pub height: u32,
    /// Container duration in seconds. `0.0` when ffprobe cannot tell.
    pub duration_secs: f64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probe the first video stream of `path`.
pub fn probe_video(path: &Path) -> BlasterResult<VideoProbe> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,duration:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                BlasterError::unsupported("video sources need ffprobe on PATH")
            } else {
                BlasterError::media_load(format!("Failed to start ffprobe: {e}"))
            }
        })?;

    if !output.status.success() {
        return Err(BlasterError::media_load(format!(
            "ffprobe failed for {} (status {}): {}",
            path.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&raw)
}

fn parse_probe_output(raw: &str) -> BlasterResult<VideoProbe> {
    let parsed: ProbeOutput = serde_json::from_str(raw)?;
    let stream = parsed
        .streams
        .first()
        .ok_or_else(|| BlasterError::media_load("no video stream found"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(BlasterError::media_load("video stream has no dimensions")),
    };

    let duration_secs = parsed
        .format
        .and_then(|f| f.duration)
        .or_else(|| stream.duration.clone())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);

    Ok(VideoProbe {
        width,
        height,
        duration_secs,
    })
}
