//! Pose source that plays back recorded pose batches.
//!
//! File format (JSON), one batch per frame:
//!
//! ```json
//! { "batches": [ [ { "score": 0.9, "keypoints": [ { "part": "rightWrist",
//!     "score": 0.8, "position": { "x": 300.0, "y": 310.0 } }, ... ] } ] ] }
//! ```
//!
//! Recordings hold raw model output; `EstimationConfig` filtering and flipping
//! are applied on playback.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use crate::camera::VideoFrame;
use crate::config::{EstimationConfig, ModelConfig};
use crate::error::{FrameError, SessionError};
use crate::session::PoseSourceLoader;

use super::keypoint::Pose;
use super::source::{postprocess, PoseSource};

#[derive(Debug, Deserialize)]
struct Recording {
    batches: Vec<Vec<Pose>>,
}

pub struct ReplayPoseSource {
    batches: Vec<Vec<Pose>>,
    cursor: usize,
    looping: bool,
}

impl ReplayPoseSource {
    pub fn new(batches: Vec<Vec<Pose>>, looping: bool) -> Self {
        Self {
            batches,
            cursor: 0,
            looping,
        }
    }

    pub fn from_json(json: &str, looping: bool) -> Result<Self, serde_json::Error> {
        let recording: Recording = serde_json::from_str(json)?;
        Ok(Self::new(recording.batches, looping))
    }

    pub fn from_path<P: AsRef<Path>>(path: P, looping: bool) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SessionError::PoseSourceLoad(format!("{}: {e}", path.display())))?;
        Self::from_json(&json, looping)
            .map_err(|e| SessionError::PoseSourceLoad(format!("{}: {e}", path.display())))
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Next recorded batch; empty once a non-looping recording runs out
    fn next_batch(&mut self) -> Vec<Pose> {
        if self.batches.is_empty() {
            return Vec::new();
        }
        if self.cursor >= self.batches.len() {
            if !self.looping {
                return Vec::new();
            }
            self.cursor = 0;
        }
        let batch = self.batches[self.cursor].clone();
        self.cursor += 1;
        batch
    }
}

#[async_trait]
impl PoseSource for ReplayPoseSource {
    async fn estimate(
        &mut self,
        frame: &VideoFrame,
        config: &EstimationConfig,
    ) -> Result<Vec<Pose>, FrameError> {
        let batch = self.next_batch();
        Ok(postprocess(batch, frame.width, config))
    }
}

/// Loads [`ReplayPoseSource`] from `ModelConfig::path`.
#[derive(Debug, Clone, Default)]
pub struct ReplayLoader;

#[async_trait]
impl PoseSourceLoader for ReplayLoader {
    async fn load(&self, config: &ModelConfig) -> Result<Box<dyn PoseSource>, SessionError> {
        let source = ReplayPoseSource::from_path(&config.path, config.looping)?;
        log::info!("replay loaded: {} batches from {}", source.len(), config.path);
        Ok(Box::new(source))
    }
}
