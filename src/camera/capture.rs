use async_trait::async_trait;
use opencv::{
    core::{AlgorithmHint, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};

use crate::config::CameraConfig;
use crate::error::{FrameError, SessionError};

use super::{classify_open_error, Camera, VideoFrame, VideoSource};

/// Opens local capture devices through OpenCV.
#[derive(Debug, Clone, Default)]
pub struct OpenCvCamera;

#[async_trait]
impl Camera for OpenCvCamera {
    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn VideoSource>, SessionError> {
        let config = config.clone();
        let video = tokio::task::block_in_place(|| OpenCvVideo::open(&config))?;
        Ok(Box::new(video))
    }
}

pub struct OpenCvVideo {
    capture: VideoCapture,
    width: u32,
    height: u32,
    next_id: u64,
}

impl OpenCvVideo {
    /// Open device `config.index`, requesting the configured size and fps.
    /// `facing` has no meaning for OpenCV devices and is ignored.
    pub fn open(config: &CameraConfig) -> Result<Self, SessionError> {
        let mut capture = VideoCapture::new(config.index, VideoCaptureAPIs::CAP_ANY as i32)
            .map_err(|e| classify_open_error(&e.to_string()))?;

        if !capture.is_opened().map_err(|e| classify_open_error(&e.to_string()))? {
            return Err(classify_open_error(&format!(
                "camera {} is not available",
                config.index
            )));
        }

        let setup = |capture: &mut VideoCapture| -> opencv::Result<()> {
            capture.set(videoio::CAP_PROP_FRAME_WIDTH, config.width as f64)?;
            capture.set(videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64)?;
            capture.set(videoio::CAP_PROP_FPS, config.fps as f64)?;
            capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;
            Ok(())
        };
        setup(&mut capture).map_err(|e| SessionError::CameraUnavailable(e.to_string()))?;

        let width = capture
            .get(videoio::CAP_PROP_FRAME_WIDTH)
            .map_err(|e| SessionError::CameraUnavailable(e.to_string()))? as u32;
        let height = capture
            .get(videoio::CAP_PROP_FRAME_HEIGHT)
            .map_err(|e| SessionError::CameraUnavailable(e.to_string()))? as u32;
        log::info!(
            "camera {} opened: {}x{} (requested {}x{})",
            config.index,
            width,
            height,
            config.width,
            config.height
        );

        Ok(Self {
            capture,
            width,
            height,
            next_id: 0,
        })
    }

    /// Blocking read of one BGR frame, converted to RGB
    fn read_rgb(&mut self) -> opencv::Result<Option<(u32, u32, Vec<u8>)>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &frame,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;
        let rgb = if rgb.is_continuous() { rgb } else { rgb.try_clone()? };
        let data = rgb.data_bytes()?.to_vec();
        Ok(Some((rgb.cols() as u32, rgb.rows() as u32, data)))
    }
}

#[async_trait]
impl VideoSource for OpenCvVideo {
    async fn next_frame(&mut self) -> Result<VideoFrame, FrameError> {
        let read = tokio::task::block_in_place(|| self.read_rgb())
            .map_err(|e| FrameError::Unavailable(e.to_string()))?;
        let (width, height, data) =
            read.ok_or_else(|| FrameError::Unavailable("empty frame received".to_string()))?;
        let frame = VideoFrame {
            frame_id: self.next_id,
            width,
            height,
            data,
        };
        self.next_id += 1;
        Ok(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
