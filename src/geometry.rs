//! Circle primitive and the overlap test that decides whether the tracked
//! wrist touches the target.

use serde::{Deserialize, Serialize};

/// Overlay color of an untouched target (0RGB)
pub const UNTOUCHED_COLOR: u32 = 0x000000; // black

/// Overlay color of a touched target (0RGB)
pub const TOUCHED_COLOR: u32 = 0x00FF00; // green

/// Whether the tracked point currently overlaps the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionStatus {
    #[default]
    Untouched,
    Touched,
}

impl CollisionStatus {
    pub fn from_hit(hit: bool) -> Self {
        if hit {
            Self::Touched
        } else {
            Self::Untouched
        }
    }

    pub fn is_touched(self) -> bool {
        matches!(self, Self::Touched)
    }

    pub fn color(self) -> u32 {
        match self {
            Self::Untouched => UNTOUCHED_COLOR,
            Self::Touched => TOUCHED_COLOR,
        }
    }
}

/// A circle in frame pixel coordinates.
///
/// `label` only identifies the circle; collision state lives on [`Target`].
/// A non-positive radius is accepted and never collides with a point probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub label: String,
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
}

impl Circle {
    pub fn new(label: impl Into<String>, center_x: f32, center_y: f32, radius: f32) -> Self {
        Self {
            label: label.into(),
            center_x,
            center_y,
            radius,
        }
    }

    /// Distance between the two centers
    pub fn center_distance(&self, other: &Circle) -> f32 {
        (self.center_x - other.center_x).hypot(self.center_y - other.center_y)
    }

    pub fn collides(&self, other: &Circle) -> bool {
        collides(self, other)
    }
}

/// Circle-circle overlap: the center distance must be strictly below the sum
/// of the radii. Touching exactly at the boundary is not a collision.
pub fn collides(a: &Circle, b: &Circle) -> bool {
    a.center_distance(b) < a.radius + b.radius
}

/// The on-screen target: a fixed circle plus its collision status.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    circle: Circle,
    status: CollisionStatus,
}

impl Target {
    pub fn new(circle: Circle) -> Self {
        Self {
            circle,
            status: CollisionStatus::Untouched,
        }
    }

    pub fn circle(&self) -> &Circle {
        &self.circle
    }

    pub fn status(&self) -> CollisionStatus {
        self.status
    }

    /// Test `probe` against the target and record the outcome.
    pub fn observe(&mut self, probe: &Circle) -> CollisionStatus {
        self.status = CollisionStatus::from_hit(collides(probe, &self.circle));
        self.status
    }

    pub fn color(&self) -> u32 {
        self.status.color()
    }
}
