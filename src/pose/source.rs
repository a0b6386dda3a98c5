use async_trait::async_trait;

use crate::camera::VideoFrame;
use crate::config::EstimationConfig;
use crate::error::FrameError;

use super::keypoint::Pose;

/// Anything that turns a video frame into detected poses.
///
/// `estimate` takes `&mut self`, so a source can serve at most one frame at
/// a time.
#[async_trait]
pub trait PoseSource: Send {
    async fn estimate(
        &mut self,
        frame: &VideoFrame,
        config: &EstimationConfig,
    ) -> Result<Vec<Pose>, FrameError>;
}

/// Output filtering common to every source:
/// - drop poses scoring below `score_threshold`
/// - mirror x across the frame when `flip_horizontal` is set
/// - keep at most `max_detections` poses, best first
pub fn postprocess(mut poses: Vec<Pose>, frame_width: u32, config: &EstimationConfig) -> Vec<Pose> {
    poses.retain(|p| p.score >= config.score_threshold);
    poses.sort_by(|a, b| b.score.total_cmp(&a.score));
    poses.truncate(config.max_detections);
    if config.flip_horizontal {
        for pose in poses.iter_mut() {
            pose.flip_horizontal(frame_width as f32);
        }
    }
    poses
}
