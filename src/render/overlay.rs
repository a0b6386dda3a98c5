use crate::camera::VideoFrame;
use crate::error::RenderError;
use crate::geometry::Circle;
use crate::pose::Keypoint;

/// Drawing surface the detection loop redraws every frame.
///
/// Drawing calls only touch the surface; `present` hands a finished frame to
/// whatever shows it.
pub trait Overlay {
    fn clear(&mut self);

    /// Dots for keypoints at or above `min_confidence`
    fn draw_keypoints(&mut self, keypoints: &[Keypoint], min_confidence: f32);

    /// Limb lines whose ends both reach `min_confidence`
    fn draw_skeleton(&mut self, keypoints: &[Keypoint], min_confidence: f32);

    fn draw_circle(&mut self, circle: &Circle, color: u32);

    fn present(&mut self, _frame: &VideoFrame) -> Result<(), RenderError> {
        Ok(())
    }
}

impl<O: Overlay + ?Sized> Overlay for Box<O> {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn draw_keypoints(&mut self, keypoints: &[Keypoint], min_confidence: f32) {
        (**self).draw_keypoints(keypoints, min_confidence)
    }

    fn draw_skeleton(&mut self, keypoints: &[Keypoint], min_confidence: f32) {
        (**self).draw_skeleton(keypoints, min_confidence)
    }

    fn draw_circle(&mut self, circle: &Circle, color: u32) {
        (**self).draw_circle(circle, color)
    }

    fn present(&mut self, frame: &VideoFrame) -> Result<(), RenderError> {
        (**self).present(frame)
    }
}

/// Overlay that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOverlay;

impl Overlay for NullOverlay {
    fn clear(&mut self) {}
    fn draw_keypoints(&mut self, _keypoints: &[Keypoint], _min_confidence: f32) {}
    fn draw_skeleton(&mut self, _keypoints: &[Keypoint], _min_confidence: f32) {}
    fn draw_circle(&mut self, _circle: &Circle, _color: u32) {}
}
