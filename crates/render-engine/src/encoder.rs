//! Video encoder service.
//!
//! An encoder accepts fixed-size RGBA frames one at a time and, on
//! finalize, returns the finished file bytes. Encoders are single-use: the
//! recorder drops one after every recording and on every canvas resize, and
//! asks its [`EncoderFactory`] for a fresh one.
//!
//! Two backends exist: H.264/MP4 through an `ffmpeg` child process, and an
//! in-process animated GIF encoder built on `image`.

use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use blaster_common::error::{BlasterError, BlasterResult};
use blaster_common::process::command_exists;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use serde::{Deserialize, Serialize};

/// File name of an MP4 recording.
pub const MP4_FILE_NAME: &str = "blaster.mp4";

/// File name of a GIF recording.
pub const GIF_FILE_NAME: &str = "blaster.gif";

/// Palette quantizer speed, 1 (best) to 30 (fastest).
const GIF_QUANTIZER_SPEED: i32 = 10;

/// Encoder parameters. Dimensions are fixed for the encoder's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Target bitrate in kbit/s.
    pub bitrate_kbps: u32,
    /// Frames between keyframes (GOP length).
    pub keyframe_interval: u32,
}

impl EncoderSettings {
    /// Byte length of one RGBA frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// A single-use video encoder.
pub trait VideoEncoder: Send {
    fn settings(&self) -> &EncoderSettings;

    /// Append one frame. `rgba` must be exactly `frame_bytes()` long.
    fn add_frame_rgba(&mut self, rgba: &[u8]) -> BlasterResult<()>;

    /// Flush and return the container bytes. The encoder accepts no frames
    /// afterwards.
    fn finalize(&mut self) -> BlasterResult<Vec<u8>>;
}

/// Creates encoders on demand.
pub trait EncoderFactory: Send {
    fn create(&self, settings: EncoderSettings) -> BlasterResult<Box<dyn VideoEncoder>>;

    /// Whether the backend can run on this system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;

    /// Name the finished recording is delivered under.
    fn file_name(&self) -> &str {
        MP4_FILE_NAME
    }
}

/// Container a recording is written as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Mp4,
    Gif,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Gif => "gif",
        }
    }

    /// Encoder backend producing this format.
    pub fn factory(self) -> Box<dyn EncoderFactory> {
        match self {
            Self::Mp4 => Box::new(FfmpegEncoderFactory),
            Self::Gif => Box::new(GifEncoderFactory),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = BlasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "gif" => Ok(Self::Gif),
            other => Err(BlasterError::config(format!(
                "unknown export format '{other}' (expected mp4 or gif)"
            ))),
        }
    }
}

fn check_geometry(settings: &EncoderSettings) -> BlasterResult<()> {
    if settings.width == 0 || settings.height == 0 || settings.fps == 0 {
        return Err(BlasterError::encode(format!(
            "invalid encoder geometry {}x{} @ {} fps",
            settings.width, settings.height, settings.fps
        )));
    }
    Ok(())
}

fn check_frame_len(settings: &EncoderSettings, rgba: &[u8]) -> BlasterResult<()> {
    let expected = settings.frame_bytes();
    if rgba.len() != expected {
        return Err(BlasterError::encode(format!(
            "frame is {} bytes, encoder expects {expected}",
            rgba.len()
        )));
    }
    Ok(())
}

/// Encodes with an `ffmpeg` child process fed raw RGBA on stdin.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoderFactory;

impl EncoderFactory for FfmpegEncoderFactory {
    fn create(&self, settings: EncoderSettings) -> BlasterResult<Box<dyn VideoEncoder>> {
        Ok(Box::new(FfmpegEncoder::spawn(settings)?))
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg")
    }

    fn name(&self) -> &str {
        "ffmpeg-libx264"
    }
}

static ENCODE_SEQ: AtomicU64 = AtomicU64::new(0);

/// H.264/MP4 encoder backed by `ffmpeg`.
pub struct FfmpegEncoder {
    settings: EncoderSettings,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    temp_path: PathBuf,
    frames: u64,
}

impl FfmpegEncoder {
    pub fn spawn(settings: EncoderSettings) -> BlasterResult<Self> {
        check_geometry(&settings)?;

        let seq = ENCODE_SEQ.fetch_add(1, Ordering::Relaxed);
        let temp_path =
            std::env::temp_dir().join(format!("blaster-encode-{}-{seq}.mp4", std::process::id()));

        let args = encoder_args(&settings, &temp_path);
        tracing::debug!(?args, "Spawning ffmpeg encoder");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    BlasterError::unsupported("ffmpeg was not found on PATH")
                } else {
                    BlasterError::encode(format!("Failed to start ffmpeg: {e}"))
                }
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BlasterError::encode("Failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BlasterError::encode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || {
            let mut output = String::new();
            let mut reader = std::io::BufReader::new(stderr);
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(
            pid = child.id(),
            width = settings.width,
            height = settings.height,
            fps = settings.fps,
            bitrate_kbps = settings.bitrate_kbps,
            "ffmpeg encoder started"
        );

        Ok(Self {
            settings,
            child: Some(child),
            stdin: Some(stdin),
            stderr_task: Some(stderr_task),
            temp_path,
            frames: 0,
        })
    }

    fn stderr_output(&mut self) -> String {
        self.stderr_task
            .take()
            .and_then(|task| task.join().ok())
            .unwrap_or_default()
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    fn add_frame_rgba(&mut self, rgba: &[u8]) -> BlasterResult<()> {
        check_frame_len(&self.settings, rgba)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| BlasterError::encode("encoder already finalized"))?;
        stdin
            .write_all(rgba)
            .map_err(|e| BlasterError::encode(format!("Failed to write frame {}: {e}", self.frames)))?;
        self.frames += 1;
        Ok(())
    }

    fn finalize(&mut self) -> BlasterResult<Vec<u8>> {
        // Closing stdin signals end of stream.
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| BlasterError::encode("encoder already finalized"))?;
        let status = child
            .wait()
            .map_err(|e| BlasterError::encode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr = self.stderr_output();

        if !status.success() {
            return Err(BlasterError::encode(format!(
                "ffmpeg encode failed (status {status}): {}",
                stderr.trim()
            )));
        }

        let bytes = std::fs::read(&self.temp_path)?;
        std::fs::remove_file(&self.temp_path).ok();
        tracing::info!(frames = self.frames, bytes = bytes.len(), "Encoder finalized");
        Ok(bytes)
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(task) = self.stderr_task.take() {
            let _ = task.join();
        }
        if self.temp_path.exists() {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

/// Encodes looping animated GIFs in-process.
#[derive(Debug, Clone, Default)]
pub struct GifEncoderFactory;

impl EncoderFactory for GifEncoderFactory {
    fn create(&self, settings: EncoderSettings) -> BlasterResult<Box<dyn VideoEncoder>> {
        Ok(Box::new(GifVideoEncoder::new(settings)?))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "image-gif"
    }

    fn file_name(&self) -> &str {
        GIF_FILE_NAME
    }
}

/// In-memory sink the GIF encoder writes into.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn take(&self) -> BlasterResult<Vec<u8>> {
        let mut bytes = self
            .0
            .lock()
            .map_err(|_| BlasterError::encode("GIF output buffer poisoned"))?;
        Ok(std::mem::take(&mut *bytes))
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("GIF output buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Animated GIF encoder. Every frame is shown for one frame interval and
/// the animation loops forever.
pub struct GifVideoEncoder {
    settings: EncoderSettings,
    encoder: Option<GifEncoder<SharedBuffer>>,
    output: SharedBuffer,
    delay: Delay,
    frames: u64,
}

impl GifVideoEncoder {
    pub fn new(settings: EncoderSettings) -> BlasterResult<Self> {
        check_geometry(&settings)?;

        let output = SharedBuffer::default();
        let mut encoder = GifEncoder::new_with_speed(output.clone(), GIF_QUANTIZER_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| BlasterError::encode(format!("Failed to start GIF encoder: {e}")))?;

        tracing::info!(
            width = settings.width,
            height = settings.height,
            fps = settings.fps,
            "GIF encoder started"
        );

        Ok(Self {
            delay: Delay::from_numer_denom_ms(1000, settings.fps),
            settings,
            encoder: Some(encoder),
            output,
            frames: 0,
        })
    }
}

impl VideoEncoder for GifVideoEncoder {
    fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    fn add_frame_rgba(&mut self, rgba: &[u8]) -> BlasterResult<()> {
        check_frame_len(&self.settings, rgba)?;
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| BlasterError::encode("encoder already finalized"))?;
        let image = RgbaImage::from_raw(self.settings.width, self.settings.height, rgba.to_vec())
            .ok_or_else(|| BlasterError::encode("frame does not match the encoder size"))?;
        encoder
            .encode_frame(Frame::from_parts(image, 0, 0, self.delay))
            .map_err(|e| BlasterError::encode(format!("Failed to encode frame {}: {e}", self.frames)))?;
        self.frames += 1;
        Ok(())
    }

    fn finalize(&mut self) -> BlasterResult<Vec<u8>> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| BlasterError::encode("encoder already finalized"))?;
        if self.frames == 0 {
            return Err(BlasterError::encode("GIF has no frames"));
        }
        // Dropping the encoder writes the trailer.
        drop(encoder);
        let bytes = self.output.take()?;
        tracing::info!(frames = self.frames, bytes = bytes.len(), "Encoder finalized");
        Ok(bytes)
    }
}

fn encoder_args(settings: &EncoderSettings, output: &std::path::Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-s:v".to_string(),
        format!("{}x{}", settings.width, settings.height),
        "-r".to_string(),
        settings.fps.to_string(),
        "-i".to_string(),
        "pipe:0".to_string(),
        "-an".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-b:v".to_string(),
        format!("{}k", settings.bitrate_kbps),
        "-g".to_string(),
        settings.keyframe_interval.max(1).to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-f".to_string(),
        "mp4".to_string(),
        output.display().to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> EncoderSettings {
        EncoderSettings {
            width: 1080,
            height: 1920,
            fps: 30,
            bitrate_kbps: 50_000,
            keyframe_interval: 10,
        }
    }

    #[test]
    fn test_frame_bytes() {
        assert_eq!(settings().frame_bytes(), 1080 * 1920 * 4);
    }

    #[test]
    fn test_encoder_args() {
        let args = encoder_args(&settings(), std::path::Path::new("/tmp/out.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s:v 1080x1920 -r 30 -i pipe:0"));
        assert!(joined.contains("-c:v libx264 -b:v 50000k -g 10"));
        assert!(joined.contains("-pix_fmt yuv420p"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }

    #[test]
    fn test_zero_geometry_rejected() {
        let bad = EncoderSettings {
            width: 0,
            ..settings()
        };
        assert!(matches!(
            FfmpegEncoder::spawn(bad),
            Err(BlasterError::Encode { .. })
        ));
    }

    fn small() -> EncoderSettings {
        EncoderSettings {
            width: 16,
            height: 16,
            fps: 10,
            bitrate_kbps: 1_000,
            keyframe_interval: 10,
        }
    }

    #[test]
    fn test_gif_encoder_writes_every_frame() {
        use image::codecs::gif::GifDecoder;
        use image::AnimationDecoder;

        let settings = small();
        let mut encoder = GifEncoderFactory.create(settings).unwrap();
        for shade in [0u8, 60, 120, 180, 240] {
            let frame = RgbaImage::from_pixel(16, 16, image::Rgba([shade, shade, shade, 255]));
            encoder.add_frame_rgba(frame.as_raw()).unwrap();
        }
        let bytes = encoder.finalize().unwrap();
        assert!(bytes.starts_with(b"GIF89a"));

        let decoder = GifDecoder::new(std::io::Cursor::new(bytes)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].buffer().dimensions(), (16, 16));
        let (numer, denom) = frames[0].delay().numer_denom_ms();
        assert_eq!(numer / denom.max(1), 100);
    }

    #[test]
    fn test_gif_encoder_rejects_bad_frames() {
        let mut encoder = GifVideoEncoder::new(small()).unwrap();
        assert!(encoder.add_frame_rgba(&[0; 12]).is_err());
        assert!(matches!(encoder.finalize(), Err(BlasterError::Encode { .. })));
        assert!(encoder.finalize().is_err());
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("gif".parse::<ExportFormat>().unwrap(), ExportFormat::Gif);
        assert_eq!(" MP4 ".parse::<ExportFormat>().unwrap(), ExportFormat::Mp4);
        assert!("webm".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::default(), ExportFormat::Mp4);
        assert_eq!(ExportFormat::Gif.to_string(), "gif");
        assert_eq!(ExportFormat::Gif.factory().file_name(), GIF_FILE_NAME);
        assert_eq!(ExportFormat::Mp4.factory().file_name(), MP4_FILE_NAME);
    }
}
