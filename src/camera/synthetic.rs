//! Camera stand-in that produces blank frames, for replay runs and tests.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::config::CameraConfig;
use crate::error::{FrameError, SessionError};

use super::{Camera, VideoFrame, VideoSource};

/// Opens [`SyntheticVideo`] streams. `paced` makes each stream deliver
/// frames at the configured fps instead of as fast as they are asked for.
#[derive(Debug, Clone, Default)]
pub struct SyntheticCamera {
    pub paced: bool,
}

#[async_trait]
impl Camera for SyntheticCamera {
    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn VideoSource>, SessionError> {
        if config.width == 0 || config.height == 0 {
            return Err(SessionError::CameraUnavailable(format!(
                "unsupported resolution {}x{}",
                config.width, config.height
            )));
        }
        let mut video = SyntheticVideo::new(config.width, config.height);
        if self.paced && config.fps > 0 {
            video = video.with_fps(config.fps);
        }
        log::debug!("synthetic camera opened ({}x{})", config.width, config.height);
        Ok(Box::new(video))
    }
}

pub struct SyntheticVideo {
    width: u32,
    height: u32,
    next_id: u64,
    pacing: Option<Interval>,
}

impl SyntheticVideo {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_id: 0,
            pacing: None,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        let mut ticker = interval(Duration::from_secs(1) / fps.max(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.pacing = Some(ticker);
        self
    }
}

#[async_trait]
impl VideoSource for SyntheticVideo {
    async fn next_frame(&mut self) -> Result<VideoFrame, FrameError> {
        if let Some(ticker) = self.pacing.as_mut() {
            ticker.tick().await;
        }
        let frame = VideoFrame::blank(self.next_id, self.width, self.height);
        self.next_id += 1;
        Ok(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
