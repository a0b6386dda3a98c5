use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::pose::KeypointIndex;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub estimation: EstimationConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    #[default]
    User,
    Environment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// OpenCV device index
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_video_width")]
    pub width: u32,
    #[serde(default = "default_video_height")]
    pub height: u32,
    #[serde(default)]
    pub facing: Facing,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_video_width() -> u32 { 1000 }
fn default_video_height() -> u32 { 1000 }
fn default_fps() -> u32 { 30 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_video_width(),
            height: default_video_height(),
            facing: Facing::default(),
            fps: default_fps(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_size")]
    pub width: u32,
    #[serde(default = "default_canvas_size")]
    pub height: u32,
}

fn default_canvas_size() -> u32 { 800 }

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_size(),
            height: default_canvas_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Recorded pose batches from a JSON file
    #[default]
    Replay,
    /// MoveNet Lightning ONNX model (`desktop` feature)
    MoveNet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub kind: ModelKind,
    /// Replay file or ONNX model, depending on `kind`
    #[serde(default = "default_model_path")]
    pub path: String,
    /// Square model input edge in pixels
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    /// Restart a replay from the top once it runs out
    #[serde(default = "default_true")]
    pub looping: bool,
}

fn default_model_path() -> String { "poses.json".to_string() }
fn default_input_size() -> u32 { 192 }
fn default_true() -> bool { true }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            path: default_model_path(),
            input_size: default_input_size(),
            looping: default_true(),
        }
    }
}

/// Options handed to the pose source on every estimate call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EstimationConfig {
    /// Mirror output so the overlay reads like a mirror
    #[serde(default = "default_true")]
    pub flip_horizontal: bool,
    #[serde(default = "default_max_detections")]
    pub max_detections: usize,
    /// Poses scoring below this are dropped by the source
    #[serde(default = "default_min_part_confidence")]
    pub score_threshold: f32,
    /// Non-maximum suppression radius in pixels, for multi-person decoders
    #[serde(default = "default_nms_radius")]
    pub nms_radius: f32,
}

fn default_max_detections() -> usize { 1 }
fn default_nms_radius() -> f32 { 30.0 }

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            flip_horizontal: default_true(),
            max_detections: default_max_detections(),
            score_threshold: default_min_part_confidence(),
            nms_radius: default_nms_radius(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectionConfig {
    /// Poses below this score are not drawn (they still drive collision)
    #[serde(default = "default_min_pose_confidence")]
    pub min_pose_confidence: f32,
    /// Keypoints below this score are not drawn
    #[serde(default = "default_min_part_confidence")]
    pub min_part_confidence: f32,
    #[serde(default = "default_tracked_part")]
    pub tracked_part: KeypointIndex,
    /// Radius of the probe circle placed on the tracked keypoint
    #[serde(default = "default_tracked_radius")]
    pub tracked_radius: f32,
    /// Pacing between frames; 0 only yields to the scheduler
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

fn default_min_pose_confidence() -> f32 { 0.15 }
fn default_min_part_confidence() -> f32 { 0.1 }
fn default_tracked_part() -> KeypointIndex { KeypointIndex::RightWrist }
fn default_tracked_radius() -> f32 { 1.0 }
fn default_frame_interval_ms() -> u64 { 33 }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_pose_confidence: default_min_pose_confidence(),
            min_part_confidence: default_min_part_confidence(),
            tracked_part: default_tracked_part(),
            tracked_radius: default_tracked_radius(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_label")]
    pub label: String,
    #[serde(default = "default_target_center")]
    pub x: f32,
    #[serde(default = "default_target_center")]
    pub y: f32,
    #[serde(default = "default_target_radius")]
    pub radius: f32,
}

fn default_target_label() -> String { "target".to_string() }
fn default_target_center() -> f32 { 300.0 }
fn default_target_radius() -> f32 { 50.0 }

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            label: default_target_label(),
            x: default_target_center(),
            y: default_target_center(),
            radius: default_target_radius(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// off / error / warn / info / debug / trace
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Mirror log lines into logs/
    #[serde(default)]
    pub file: bool,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("invalid config")?;
        Ok(config)
    }

    /// Defaults when the file is missing or malformed. The load error comes
    /// back with them, since the logger is usually not installed yet.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<anyhow::Error>) {
        match Self::load(path.as_ref()) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }
}
