//! Frame timing
//!
//! Maps frame numbers to presentation timestamps. The production resolver shells
//! out to `ffprobe`; [`StaticFrameTimes`] serves known timings without a video.

use crate::error::ReconcileError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Per-frame timing of one video
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTimes {
    /// Presentation timestamp of each frame (milliseconds), indexed by frame number
    pub timestamps_ms: Vec<i64>,
    pub frame_count: usize,
    /// Container duration, when the probe reports one
    pub duration_ms: Option<i64>,
}

impl FrameTimes {
    pub fn new(timestamps_ms: Vec<i64>) -> Self {
        let frame_count = timestamps_ms.len();
        Self {
            timestamps_ms,
            frame_count,
            duration_ms: None,
        }
    }

    /// Timestamp of `frame_index`, if the video has that frame
    pub fn time_of(&self, frame_index: usize) -> Option<i64> {
        self.timestamps_ms.get(frame_index).copied()
    }
}

/// Trait for frame timing sources
pub trait FrameTimeResolver {
    /// Resolve per-frame timestamps for the video at `video`
    fn resolve(&self, video: &Path) -> Result<FrameTimes, ReconcileError>;
}

/// Resolver backed by the `ffprobe` binary
pub struct FfprobeResolver {
    ffprobe_path: PathBuf,
}

impl FfprobeResolver {
    /// Locate `ffprobe` on PATH
    pub fn new() -> Result<Self, ReconcileError> {
        Ok(Self {
            ffprobe_path: which_command("ffprobe")?,
        })
    }

    pub fn with_path(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe_path
    }
}

impl FrameTimeResolver for FfprobeResolver {
    fn resolve(&self, video: &Path) -> Result<FrameTimes, ReconcileError> {
        if !video.is_file() {
            return Err(ReconcileError::FrameTime(format!(
                "video not found: {}",
                video.display()
            )));
        }

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-select_streams",
                "v:0",
                "-show_entries",
                "frame=best_effort_timestamp_time,pts_time:format=duration",
                "-print_format",
                "json",
            ])
            .arg(video)
            .output()?;

        if !output.status.success() {
            return Err(ReconcileError::FrameTime(format!(
                "ffprobe failed on {}: {}",
                video.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        let times = parse_probe_output(&json)?;
        debug!(
            video = %video.display(),
            frames = times.frame_count,
            "resolved frame timestamps"
        );
        Ok(times)
    }
}

/// Extract per-frame timestamps from ffprobe's JSON frame listing
fn parse_probe_output(json: &serde_json::Value) -> Result<FrameTimes, ReconcileError> {
    let frames = json["frames"]
        .as_array()
        .ok_or_else(|| ReconcileError::FrameTime("no frames in probe output".to_string()))?;

    let mut timestamps_ms = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let seconds = frame["best_effort_timestamp_time"]
            .as_str()
            .or_else(|| frame["pts_time"].as_str())
            .and_then(|t| t.parse::<f64>().ok())
            .ok_or_else(|| {
                ReconcileError::FrameTime(format!("frame {} has no timestamp", index))
            })?;
        timestamps_ms.push(seconds_to_ms(seconds));
    }

    let duration_ms = json["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .map(seconds_to_ms);

    Ok(FrameTimes {
        frame_count: timestamps_ms.len(),
        timestamps_ms,
        duration_ms,
    })
}

fn seconds_to_ms(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

fn which_command(name: &str) -> Result<PathBuf, ReconcileError> {
    let output = Command::new("which")
        .arg(name)
        .output()
        .map_err(|e| ReconcileError::FrameTime(format!("failed to find {}: {}", name, e)))?;

    if !output.status.success() {
        return Err(ReconcileError::FrameTime(format!(
            "{} not found in PATH",
            name
        )));
    }

    Ok(PathBuf::from(
        String::from_utf8_lossy(&output.stdout).trim(),
    ))
}

/// Resolver returning the same known timings for every video
#[derive(Debug, Clone)]
pub struct StaticFrameTimes {
    times: FrameTimes,
}

impl StaticFrameTimes {
    pub fn new(timestamps_ms: Vec<i64>) -> Self {
        Self {
            times: FrameTimes::new(timestamps_ms),
        }
    }

    /// Constant frame rate timing for `frame_count` frames
    pub fn constant_rate(fps: f64, frame_count: usize) -> Self {
        let timestamps_ms = (0..frame_count)
            .map(|i| seconds_to_ms(i as f64 / fps))
            .collect();
        Self::new(timestamps_ms)
    }
}

impl FrameTimeResolver for StaticFrameTimes {
    fn resolve(&self, _video: &Path) -> Result<FrameTimes, ReconcileError> {
        Ok(self.times.clone())
    }
}
