#[cfg(feature = "desktop")]
pub mod capture;
pub mod synthetic;

use async_trait::async_trait;

use crate::config::CameraConfig;
use crate::error::{FrameError, SessionError};

#[cfg(feature = "desktop")]
pub use capture::{OpenCvCamera, OpenCvVideo};
pub use synthetic::{SyntheticCamera, SyntheticVideo};

/// One captured frame, tightly packed RGB8.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub frame_id: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub fn blank(frame_id: u64, width: u32, height: u32) -> Self {
        Self {
            frame_id,
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 3],
        }
    }

    /// RGB of pixel (x, y)
    pub fn rgb(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        self.data.get(i..i + 3).map(|p| [p[0], p[1], p[2]])
    }
}

/// An open video stream.
#[async_trait]
pub trait VideoSource: Send {
    async fn next_frame(&mut self) -> Result<VideoFrame, FrameError>;

    fn resolution(&self) -> (u32, u32);
}

/// Opens video streams.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn VideoSource>, SessionError>;
}

/// Map a backend's open failure to the startup error the user sees.
pub fn classify_open_error(message: &str) -> SessionError {
    let lower = message.to_ascii_lowercase();
    let denied = ["permission", "not authorized", "access denied", "notallowed"]
        .iter()
        .any(|needle| lower.contains(needle));
    if denied {
        SessionError::PermissionDenied(message.to_string())
    } else {
        SessionError::CameraUnavailable(message.to_string())
    }
}
