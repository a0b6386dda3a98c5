pub mod keypoint;
#[cfg(feature = "desktop")]
pub mod movenet;
pub mod replay;
pub mod source;

pub use keypoint::{Keypoint, KeypointIndex, Pose, Position};
#[cfg(feature = "desktop")]
pub use movenet::{MoveNetLoader, MoveNetSource};
pub use replay::{ReplayLoader, ReplayPoseSource};
pub use source::{postprocess, PoseSource};
