use serde::{Deserialize, Serialize};

use crate::error::PoseError;

/// The 17 body parts reported by PoseNet/MoveNet, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Position in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Nearest pixel, for rasterizing
    pub fn to_pixel(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// A single detected body part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: KeypointIndex,
    pub position: Position,
    /// Confidence (0.0〜1.0)
    pub score: f32,
}

impl Keypoint {
    pub fn new(part: KeypointIndex, x: f32, y: f32, score: f32) -> Self {
        Self {
            part,
            position: Position::new(x, y),
            score,
        }
    }

    /// Confidence at or above the threshold
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.score >= threshold
    }

    /// Absent keypoint for `part`: origin, zero confidence
    pub fn missing(part: KeypointIndex) -> Self {
        Self::new(part, 0.0, 0.0, 0.0)
    }
}

/// One detected body: an overall score plus all 17 keypoints, indexed by part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPose")]
pub struct Pose {
    pub score: f32,
    keypoints: [Keypoint; KeypointIndex::COUNT],
}

#[derive(Deserialize)]
struct RawPose {
    score: f32,
    keypoints: Vec<Keypoint>,
}

impl TryFrom<RawPose> for Pose {
    type Error = PoseError;

    fn try_from(raw: RawPose) -> Result<Self, Self::Error> {
        Pose::from_keypoints(raw.score, raw.keypoints)
    }
}

impl Pose {
    /// Lay out keypoints by part. Every part must appear exactly once; input
    /// order does not matter.
    pub fn from_keypoints(
        score: f32,
        keypoints: impl IntoIterator<Item = Keypoint>,
    ) -> Result<Self, PoseError> {
        let mut slots: [Option<Keypoint>; KeypointIndex::COUNT] = [None; KeypointIndex::COUNT];
        for kp in keypoints {
            let slot = &mut slots[kp.part.index()];
            if slot.is_some() {
                return Err(PoseError::DuplicatePart(kp.part));
            }
            *slot = Some(kp);
        }

        let mut laid_out = [Keypoint::missing(KeypointIndex::Nose); KeypointIndex::COUNT];
        for (part, slot) in KeypointIndex::ALL.iter().zip(slots) {
            laid_out[part.index()] = slot.ok_or(PoseError::MissingPart(*part))?;
        }
        Ok(Self {
            score,
            keypoints: laid_out,
        })
    }

    /// Pose whose overall score is the mean keypoint confidence
    pub fn scored_by_keypoints(keypoints: [Keypoint; KeypointIndex::COUNT]) -> Self {
        let mut pose = Self {
            score: 0.0,
            keypoints,
        };
        pose.score = pose.average_confidence();
        pose
    }

    pub fn get(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index.index()]
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Mean confidence over all keypoints
    pub fn average_confidence(&self) -> f32 {
        let sum: f32 = self.keypoints.iter().map(|k| k.score).sum();
        sum / KeypointIndex::COUNT as f32
    }

    /// Mirror every keypoint across the vertical center line of a frame
    /// `width` pixels wide.
    pub fn flip_horizontal(&mut self, width: f32) {
        for kp in self.keypoints.iter_mut() {
            kp.position.x = width - kp.position.x;
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            score: 0.0,
            keypoints: KeypointIndex::ALL.map(Keypoint::missing),
        }
    }
}
