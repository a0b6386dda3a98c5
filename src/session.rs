//! Session startup: pick the canvas layout, load the pose source, open the
//! camera. Any failure here stops the session before the loop starts.

use async_trait::async_trait;

use crate::camera::{Camera, VideoSource};
use crate::config::{CameraConfig, Config, ModelConfig};
use crate::detection::{DetectionLoop, SessionState};
use crate::error::SessionError;
use crate::pose::PoseSource;
use crate::render::Overlay;

/// Video dimensions shrink by this factor on mobile displays
pub const MOBILE_VIDEO_SCALE: f32 = 0.7;

/// Loads a pose source from its model configuration.
#[async_trait]
pub trait PoseSourceLoader: Send + Sync {
    async fn load(&self, config: &ModelConfig) -> Result<Box<dyn PoseSource>, SessionError>;
}

/// Display characteristics, queried once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    pub width: u32,
    pub height: u32,
    pub mobile: bool,
}

/// Canvas and video sizes for the session.
///
/// Overlays draw in frame pixels, so they are sized from the video
/// dimensions. The canvas size is reported at startup only and sizes no
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub video_width: u32,
    pub video_height: u32,
}

impl CanvasLayout {
    /// On mobile the canvas becomes a square fitting the display and the
    /// video shrinks; elsewhere the configured sizes are used as-is.
    pub fn select(config: &Config, display: &DisplayInfo) -> Self {
        let layout = Self {
            canvas_width: config.canvas.width,
            canvas_height: config.canvas.height,
            video_width: config.camera.width,
            video_height: config.camera.height,
        };
        if !display.mobile {
            return layout;
        }
        let edge = display.width.min(display.height);
        Self {
            canvas_width: edge,
            canvas_height: edge,
            video_width: (layout.video_width as f32 * MOBILE_VIDEO_SCALE) as u32,
            video_height: (layout.video_height as f32 * MOBILE_VIDEO_SCALE) as u32,
        }
    }

    pub fn camera_config(&self, base: &CameraConfig) -> CameraConfig {
        CameraConfig {
            width: self.video_width,
            height: self.video_height,
            ..base.clone()
        }
    }
}

/// Handles produced by a successful startup.
pub struct Session {
    pub video: Box<dyn VideoSource>,
    pub pose_source: Box<dyn PoseSource>,
    pub layout: CanvasLayout,
}

impl Session {
    /// Build the detection loop over this session's handles
    pub fn into_loop<O: Overlay>(self, overlay: O, config: &Config) -> DetectionLoop<O> {
        DetectionLoop::new(
            self.video,
            self.pose_source,
            overlay,
            SessionState::from_config(config),
            config.estimation.clone(),
        )
    }
}

/// Start a session. The pose source is loaded before the camera is opened.
pub async fn initialize(
    camera: &dyn Camera,
    loader: &dyn PoseSourceLoader,
    config: &Config,
    display: DisplayInfo,
) -> Result<Session, SessionError> {
    let layout = CanvasLayout::select(config, &display);
    log::info!(
        "canvas {}x{}, video {}x{}{}",
        layout.canvas_width,
        layout.canvas_height,
        layout.video_width,
        layout.video_height,
        if display.mobile { " (mobile)" } else { "" }
    );

    let pose_source = loader.load(&config.model).await.inspect_err(|e| log::error!("{e}"))?;

    let camera_config = layout.camera_config(&config.camera);
    let video = camera
        .open(&camera_config)
        .await
        .inspect_err(|e| log::error!("this device or backend does not support video capture: {e}"))?;

    Ok(Session {
        video,
        pose_source,
        layout,
    })
}
