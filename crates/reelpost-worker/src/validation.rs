//! Media requirement checklist.
//!
//! Validation is a pluggable step that runs after staging and before
//! submission. The bundled [`FfprobeValidator`] probes the staged media and
//! evaluates a [`ValidationPolicy`] against the probe.

use std::process::Stdio;

use async_trait::async_trait;
use reelpost_models::{MediaKind, StagedMedia};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{WorkerError, WorkerResult};

/// Checks run against a probed video.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPolicy {
    /// Accepted container names (substring match on ffprobe's `format_name`)
    pub containers: Vec<String>,
    /// Accepted video codecs
    pub codecs: Vec<String>,
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
    pub min_fps: f64,
    pub max_fps: f64,
    pub max_size_bytes: u64,
    /// Width / height bounds; anything outside is rejected
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    /// Smallest (short side, long side) before a resolution warning
    pub recommended_min_resolution: (u32, u32),
    /// Largest (short side, long side) before the platform recompresses
    pub recommended_max_resolution: (u32, u32),
    /// Accepted audio codecs when an audio stream is present
    pub audio_codecs: Vec<String>,
    /// A video without an audio stream passes when set
    pub allow_missing_audio: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            containers: vec!["mp4".to_string(), "mov".to_string()],
            codecs: vec!["h264".to_string(), "hevc".to_string()],
            min_duration_secs: 3.0,
            max_duration_secs: 90.0,
            min_fps: 24.0,
            max_fps: 60.0,
            max_size_bytes: 100 * 1024 * 1024,
            min_aspect_ratio: 0.01,
            max_aspect_ratio: 10.0,
            recommended_min_resolution: (720, 1280),
            recommended_max_resolution: (1080, 1920),
            audio_codecs: vec!["aac".to_string()],
            allow_missing_audio: true,
        }
    }
}

/// What ffprobe reported about a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaProbe {
    pub format_name: String,
    pub duration_secs: Option<f64>,
    pub size_bytes: Option<u64>,
    pub video: Option<VideoStream>,
    pub has_audio: bool,
    pub audio_codec: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoStream {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
}

impl ValidationPolicy {
    /// Evaluate the checklist. Returns one message per failed check.
    pub fn evaluate(&self, probe: &MediaProbe) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.containers.iter().any(|c| probe.format_name.contains(c.as_str())) {
            issues.push(format!(
                "Invalid container format: {}. Expected {}.",
                probe.format_name,
                self.containers.join(" or ")
            ));
        }

        match &probe.video {
            None => issues.push("No video stream found.".to_string()),
            Some(video) => {
                if !self.codecs.iter().any(|c| video.codec.contains(c.as_str())) {
                    issues.push(format!(
                        "Video codec ({}) is not supported; expected {}.",
                        video.codec,
                        self.codecs.join(" or ")
                    ));
                }
                match video.fps {
                    Some(fps) if fps < self.min_fps || fps > self.max_fps => {
                        issues.push(format!(
                            "Frame rate ({:.2}) is outside {}-{} FPS.",
                            fps, self.min_fps, self.max_fps
                        ))
                    }
                    _ => {}
                }
                if video.width == 0 || video.height == 0 {
                    issues.push(format!(
                        "Video dimensions ({}x{}) are unknown or zero.",
                        video.width, video.height
                    ));
                } else {
                    let ratio = video.aspect_ratio();
                    if ratio < self.min_aspect_ratio || ratio > self.max_aspect_ratio {
                        issues.push(format!(
                            "Aspect ratio {:.2} ({}x{}) is outside {}:1 to {}:1.",
                            ratio,
                            video.width,
                            video.height,
                            self.min_aspect_ratio,
                            self.max_aspect_ratio
                        ));
                    }
                }
            }
        }

        match probe.duration_secs {
            None => issues.push("Video duration is unknown.".to_string()),
            Some(d) if d > self.max_duration_secs => issues.push(format!(
                "Video duration ({:.2}s) exceeds max {}s.",
                d, self.max_duration_secs
            )),
            Some(d) if d < self.min_duration_secs => issues.push(format!(
                "Video duration ({:.2}s) is too short (min {}s).",
                d, self.min_duration_secs
            )),
            Some(_) => {}
        }

        if let Some(size) = probe.size_bytes {
            if size > self.max_size_bytes {
                issues.push(format!(
                    "File size ({:.1} MB) exceeds {} MB.",
                    size as f64 / (1024.0 * 1024.0),
                    self.max_size_bytes / (1024 * 1024)
                ));
            }
        }

        if probe.has_audio {
            let codec = probe.audio_codec.as_deref().unwrap_or("unknown");
            if !self.audio_codecs.iter().any(|c| c == codec) {
                issues.push(format!(
                    "Audio codec ({}) is not supported; expected {}.",
                    codec,
                    self.audio_codecs.join(" or ")
                ));
            }
        } else if !self.allow_missing_audio {
            issues.push("No audio stream found.".to_string());
        }

        issues
    }

    /// Soft findings that do not block a post.
    pub fn warnings(&self, probe: &MediaProbe) -> Vec<String> {
        let Some(video) = probe.video.as_ref().filter(|v| v.width > 0 && v.height > 0) else {
            return Vec::new();
        };

        let short = video.width.min(video.height);
        let long = video.width.max(video.height);
        let (min_short, min_long) = self.recommended_min_resolution;
        let (max_short, max_long) = self.recommended_max_resolution;

        let mut warnings = Vec::new();
        if short < min_short || long < min_long {
            warnings.push(format!(
                "Resolution ({}x{}) is below the recommended minimum {}x{}.",
                video.width, video.height, min_short, min_long
            ));
        }
        if short > max_short || long > max_long {
            warnings.push(format!(
                "Resolution ({}x{}) exceeds {}x{}; the platform may recompress it.",
                video.width, video.height, max_short, max_long
            ));
        }
        warnings
    }
}

impl VideoStream {
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Validates staged media before it is submitted.
#[async_trait]
pub trait MediaValidator: Send + Sync {
    async fn validate(&self, media: &StagedMedia) -> WorkerResult<()>;
}

/// Checklist validator backed by `ffprobe`.
#[derive(Debug, Clone, Default)]
pub struct FfprobeValidator {
    policy: ValidationPolicy,
}

impl FfprobeValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    /// Probe a local path or URL.
    pub async fn probe(&self, input: &str) -> WorkerResult<MediaProbe> {
        which::which("ffprobe")
            .map_err(|_| WorkerError::validation_failed("ffprobe not found in PATH"))?;
        run_ffprobe("ffprobe", input).await
    }
}

async fn run_ffprobe(program: &str, input: &str) -> WorkerResult<MediaProbe> {
    let output = Command::new(program)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(input)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| WorkerError::validation_failed(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(WorkerError::validation_failed(format!(
            "Could not probe media: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_ffprobe_output(&output.stdout)
}

#[async_trait]
impl MediaValidator for FfprobeValidator {
    async fn validate(&self, media: &StagedMedia) -> WorkerResult<()> {
        if media.kind == MediaKind::Photo {
            debug!(asset_id = %media.asset_id, "Skipping validation for photo");
            return Ok(());
        }

        let input = match &media.local_path {
            Some(path) => path.display().to_string(),
            None => media.public_url.clone(),
        };
        let probe = self.probe(&input).await?;
        for warning in self.policy.warnings(&probe) {
            warn!(asset_id = %media.asset_id, "{}", warning);
        }
        let issues = self.policy.evaluate(&probe);

        if issues.is_empty() {
            info!(asset_id = %media.asset_id, "Media passed validation");
            Ok(())
        } else {
            Err(WorkerError::validation_failed(issues.join(" ")))
        }
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    format_name: String,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

fn parse_ffprobe_output(stdout: &[u8]) -> WorkerResult<MediaProbe> {
    let output: FfprobeOutput = serde_json::from_slice(stdout).map_err(|e| {
        WorkerError::validation_failed(format!("Unreadable ffprobe output: {}", e))
    })?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .map(|s| VideoStream {
            codec: s.codec_name.clone().unwrap_or_default(),
            // Missing dimensions stay zero and fail the checklist
            width: s.width.unwrap_or(0),
            height: s.height.unwrap_or(0),
            fps: s
                .avg_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate)),
        });

    let audio = output.streams.iter().find(|s| s.codec_type == "audio");

    Ok(MediaProbe {
        format_name: output.format.format_name,
        duration_secs: output.format.duration.and_then(|d| d.parse().ok()),
        size_bytes: output.format.size.and_then(|s| s.parse().ok()),
        video,
        has_audio: audio.is_some(),
        audio_codec: audio.and_then(|s| s.codec_name.clone()),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use reelpost_models::ErrorKind;

    use super::*;

    fn good_probe() -> MediaProbe {
        MediaProbe {
            format_name: "mov,mp4,m4a,3gp,3g2,mj2".into(),
            duration_secs: Some(15.0),
            size_bytes: Some(8 * 1024 * 1024),
            video: Some(VideoStream {
                codec: "h264".into(),
                width: 1080,
                height: 1920,
                fps: Some(30.0),
            }),
            has_audio: true,
            audio_codec: Some("aac".into()),
        }
    }

    fn with_size(width: u32, height: u32) -> MediaProbe {
        MediaProbe {
            video: Some(VideoStream {
                codec: "h264".into(),
                width,
                height,
                fps: Some(30.0),
            }),
            ..good_probe()
        }
    }

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_good_video_passes() {
        assert!(ValidationPolicy::default().evaluate(&good_probe()).is_empty());
    }

    #[test]
    fn test_duration_bounds() {
        let policy = ValidationPolicy::default();

        let long = MediaProbe {
            duration_secs: Some(120.0),
            ..good_probe()
        };
        assert!(policy.evaluate(&long)[0].contains("exceeds max 90s"));

        let short = MediaProbe {
            duration_secs: Some(1.5),
            ..good_probe()
        };
        assert!(policy.evaluate(&short)[0].contains("too short"));
    }

    #[test]
    fn test_missing_audio_follows_policy() {
        let silent = MediaProbe {
            has_audio: false,
            audio_codec: None,
            ..good_probe()
        };
        assert!(ValidationPolicy::default().evaluate(&silent).is_empty());

        let strict = ValidationPolicy {
            allow_missing_audio: false,
            ..Default::default()
        };
        assert_eq!(
            strict.evaluate(&silent),
            vec!["No audio stream found.".to_string()]
        );
    }

    #[test]
    fn test_wrong_codec_and_container() {
        let probe = MediaProbe {
            format_name: "matroska,webm".into(),
            video: Some(VideoStream {
                codec: "vp9".into(),
                width: 1080,
                height: 1920,
                fps: Some(30.0),
            }),
            ..good_probe()
        };
        let issues = ValidationPolicy::default().evaluate(&probe);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("container"));
        assert!(issues[1].contains("vp9"));
    }

    #[test]
    fn test_parse_ffprobe_output() {
        let stdout = br#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1080,
                 "height": 1920, "avg_frame_rate": "30000/1001"},
                {"codec_type": "audio", "codec_name": "aac"}
            ],
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                       "duration": "12.480000", "size": "5242880"}
        }"#;

        let probe = parse_ffprobe_output(stdout).unwrap();
        assert!(probe.has_audio);
        assert_eq!(probe.audio_codec.as_deref(), Some("aac"));
        assert_eq!(probe.size_bytes, Some(5_242_880));
        assert!((probe.duration_secs.unwrap() - 12.48).abs() < 0.001);
        let video = probe.video.unwrap();
        assert_eq!(video.codec, "h264");
        assert!((video.fps.unwrap() - 29.97).abs() < 0.01);
        assert_eq!((video.width, video.height), (1080, 1920));
    }

    #[test]
    fn test_extreme_aspect_ratio_is_rejected() {
        let policy = ValidationPolicy::default();

        let wide = policy.evaluate(&with_size(4000, 10));
        assert_eq!(wide.len(), 1);
        assert!(wide[0].contains("4000x10"));
        assert!(wide[0].contains("outside"));

        let thin = policy.evaluate(&with_size(10, 4000));
        assert_eq!(thin.len(), 1);
        assert!(thin[0].contains("10x4000"));

        assert!(policy.evaluate(&with_size(1920, 1080)).is_empty());
    }

    #[test]
    fn test_zero_dimensions_are_rejected() {
        let policy = ValidationPolicy::default();
        assert!(policy.evaluate(&with_size(0, 1920))[0].contains("0x1920"));
        assert!(policy.evaluate(&with_size(1080, 0))[0].contains("1080x0"));
        assert!(policy.warnings(&with_size(0, 0)).is_empty());
    }

    #[test]
    fn test_missing_dimensions_parse_as_zero_and_fail() {
        let stdout = br#"{
            "streams": [{"codec_type": "video", "codec_name": "h264", "avg_frame_rate": "30/1"}],
            "format": {"format_name": "mp4", "duration": "10.0"}
        }"#;

        let probe = parse_ffprobe_output(stdout).unwrap();
        let issues = ValidationPolicy::default().evaluate(&probe);
        assert!(issues.iter().any(|i| i.contains("0x0")));
    }

    #[test]
    fn test_audio_codec_must_be_aac() {
        let opus = MediaProbe {
            audio_codec: Some("opus".into()),
            ..good_probe()
        };
        let issues = ValidationPolicy::default().evaluate(&opus);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("opus"));

        let unknown = MediaProbe {
            audio_codec: None,
            ..good_probe()
        };
        assert!(ValidationPolicy::default().evaluate(&unknown)[0].contains("unknown"));
    }

    #[test]
    fn test_resolution_only_warns() {
        let policy = ValidationPolicy::default();

        let small = with_size(480, 854);
        assert!(policy.evaluate(&small).is_empty());
        let warnings = policy.warnings(&small);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("below"));

        let large = with_size(2160, 3840);
        assert!(policy.evaluate(&large).is_empty());
        assert!(policy.warnings(&large)[0].contains("recompress"));

        assert!(policy.warnings(&good_probe()).is_empty());
        assert!(policy.warnings(&with_size(1920, 1080)).is_empty());
    }

    #[tokio::test]
    async fn test_unrunnable_binary_is_a_validation_error() {
        let err = run_ffprobe("/nonexistent/reelpost-ffprobe", "clip.mp4")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("Failed to run ffprobe"));
    }

    #[test]
    fn test_no_video_stream() {
        let probe = MediaProbe {
            video: None,
            ..good_probe()
        };
        assert!(ValidationPolicy::default()
            .evaluate(&probe)
            .contains(&"No video stream found.".to_string()));
    }
}
