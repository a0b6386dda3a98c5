use minifb::{Key, Window, WindowOptions};

use crate::camera::VideoFrame;
use crate::error::RenderError;
use crate::geometry::Circle;
use crate::pose::Keypoint;

use super::buffer::{PixelBuffer, TRANSPARENT};
use super::overlay::Overlay;

/// Preview window: the camera frame with the overlay painted on top.
pub struct MinifbOverlay {
    window: Window,
    overlay: PixelBuffer,
    composed: Vec<u32>,
}

impl MinifbOverlay {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, RenderError> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| RenderError::Backend(e.to_string()))?;

        Ok(Self {
            window,
            overlay: PixelBuffer::new(width, height),
            composed: vec![0u32; width * height],
        })
    }

    /// Open until closed or Escape is pressed
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    fn compose(&mut self, frame: &VideoFrame) {
        let width = self.overlay.width();
        let height = self.overlay.height();
        let layer = self.overlay.buffer();

        for y in 0..height {
            for x in 0..width {
                let i = y * width + x;
                let painted = layer[i];
                self.composed[i] = if painted != TRANSPARENT {
                    painted
                } else {
                    match frame.rgb(x as u32, y as u32) {
                        Some([r, g, b]) => ((r as u32) << 16) | ((g as u32) << 8) | b as u32,
                        None => 0,
                    }
                };
            }
        }
    }
}

impl Overlay for MinifbOverlay {
    fn clear(&mut self) {
        self.overlay.clear();
    }

    fn draw_keypoints(&mut self, keypoints: &[Keypoint], min_confidence: f32) {
        self.overlay.draw_keypoints(keypoints, min_confidence);
    }

    fn draw_skeleton(&mut self, keypoints: &[Keypoint], min_confidence: f32) {
        self.overlay.draw_skeleton(keypoints, min_confidence);
    }

    fn draw_circle(&mut self, circle: &Circle, color: u32) {
        self.overlay.draw_circle(circle, color);
    }

    fn present(&mut self, frame: &VideoFrame) -> Result<(), RenderError> {
        if !self.is_open() {
            return Err(RenderError::Closed);
        }
        self.compose(frame);
        self.window
            .update_with_buffer(&self.composed, self.overlay.width(), self.overlay.height())
            .map_err(|e| RenderError::Backend(e.to_string()))
    }
}
