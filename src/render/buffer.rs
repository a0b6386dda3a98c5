use crate::geometry::Circle;
use crate::pose::Keypoint;

use super::overlay::Overlay;
use super::skeleton::{adjacent_keypoints, KEYPOINT_COLOR, KEYPOINT_RADIUS, SKELETON_COLOR};

/// Transparent pixel (0RGB with the top byte set)
pub const TRANSPARENT: u32 = 0xFF00_0000;

/// Software overlay: a 0RGB pixel buffer, `TRANSPARENT` where nothing is drawn.
pub struct PixelBuffer {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: vec![TRANSPARENT; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.offset(x, y).map(|i| self.buffer[i])
    }

    /// Number of non-transparent pixels
    pub fn painted(&self) -> usize {
        self.buffer.iter().filter(|&&p| p != TRANSPARENT).count()
    }

    /// Bresenham line, clipped to the buffer. A line lying wholly past one
    /// edge is skipped without walking it.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let (w, h) = (self.width as i64, self.height as i64);
        let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
        if (x0 < 0 && x1 < 0) || (y0 < 0 && y1 < 0) || (x0 >= w && x1 >= w) || (y0 >= h && y1 >= h) {
            return;
        }

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let step_x = if x0 < x1 { 1 } else { -1 };
        let step_y = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);

        loop {
            self.put(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let doubled = 2 * err;
            if doubled >= dy {
                err += dy;
                x += step_x;
            }
            if doubled <= dx {
                err += dx;
                y += step_y;
            }
        }
    }

    /// Filled disc, painted one clipped row span at a time
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        if radius < 0 || self.width == 0 || self.height == 0 {
            return;
        }
        let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
        let r2 = r * r;
        let top = (cy - r).max(0);
        let bottom = (cy + r).min(self.height as i64 - 1);

        for y in top..=bottom {
            let dy = y - cy;
            let half = ((r2 - dy * dy) as f64).sqrt() as i64;
            let left = (cx - half).max(0);
            let right = (cx + half).min(self.width as i64 - 1);
            if left > right {
                continue;
            }
            let row = y as usize * self.width;
            self.buffer[row + left as usize..=row + right as usize].fill(color);
        }
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    fn put(&mut self, x: i64, y: i64, color: u32) {
        if x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height {
            self.buffer[y as usize * self.width + x as usize] = color;
        }
    }
}

impl Overlay for PixelBuffer {
    fn clear(&mut self) {
        self.buffer.fill(TRANSPARENT);
    }

    fn draw_keypoints(&mut self, keypoints: &[Keypoint], min_confidence: f32) {
        for kp in keypoints.iter().filter(|k| k.is_valid(min_confidence)) {
            let (x, y) = kp.position.to_pixel();
            self.fill_circle(x, y, KEYPOINT_RADIUS, KEYPOINT_COLOR);
        }
    }

    fn draw_skeleton(&mut self, keypoints: &[Keypoint], min_confidence: f32) {
        for (start, end) in adjacent_keypoints(keypoints, min_confidence) {
            let (x0, y0) = start.position.to_pixel();
            let (x1, y1) = end.position.to_pixel();
            self.draw_line(x0, y0, x1, y1, SKELETON_COLOR);
        }
    }

    fn draw_circle(&mut self, circle: &Circle, color: u32) {
        if circle.radius <= 0.0 {
            return;
        }
        self.fill_circle(
            circle.center_x.round() as i32,
            circle.center_y.round() as i32,
            circle.radius.round() as i32,
            color,
        );
    }
}
