use crate::pose::{Keypoint, KeypointIndex};

/// Limb connections drawn for a pose (start keypoint, end keypoint)
pub const SKELETON_CONNECTIONS: [(KeypointIndex, KeypointIndex); 12] = [
    // arms
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftElbow),
    (KeypointIndex::LeftElbow, KeypointIndex::LeftWrist),
    (KeypointIndex::RightShoulder, KeypointIndex::RightElbow),
    (KeypointIndex::RightElbow, KeypointIndex::RightWrist),
    // torso
    (KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder),
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftHip),
    (KeypointIndex::RightShoulder, KeypointIndex::RightHip),
    (KeypointIndex::LeftHip, KeypointIndex::RightHip),
    // legs
    (KeypointIndex::LeftHip, KeypointIndex::LeftKnee),
    (KeypointIndex::LeftKnee, KeypointIndex::LeftAnkle),
    (KeypointIndex::RightHip, KeypointIndex::RightKnee),
    (KeypointIndex::RightKnee, KeypointIndex::RightAnkle),
];

/// Keypoint dot color (0RGB)
pub const KEYPOINT_COLOR: u32 = 0x00FFFF; // aqua

/// Limb line color (0RGB)
pub const SKELETON_COLOR: u32 = 0xFFFF00; // yellow

/// Keypoint dot radius in pixels
pub const KEYPOINT_RADIUS: i32 = 3;

/// Limb pairs whose ends both reach `min_confidence`.
///
/// `keypoints` is indexed by part, as returned by `Pose::keypoints`.
pub fn adjacent_keypoints(
    keypoints: &[Keypoint],
    min_confidence: f32,
) -> Vec<(&Keypoint, &Keypoint)> {
    SKELETON_CONNECTIONS
        .iter()
        .filter_map(|(a, b)| {
            let start = keypoints.get(a.index())?;
            let end = keypoints.get(b.index())?;
            (start.is_valid(min_confidence) && end.is_valid(min_confidence)).then_some((start, end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_keypoints_filters_low_confidence() {
        let mut kps = KeypointIndex::ALL.map(|part| Keypoint::new(part, 0.0, 0.0, 0.9));
        kps[KeypointIndex::RightElbow.index()].score = 0.05;

        let pairs = adjacent_keypoints(&kps, 0.1);
        // both right-elbow limbs are gone
        assert_eq!(pairs.len(), SKELETON_CONNECTIONS.len() - 2);
        assert!(pairs
            .iter()
            .all(|(a, b)| a.part != KeypointIndex::RightElbow && b.part != KeypointIndex::RightElbow));
    }

    #[test]
    fn test_adjacent_keypoints_short_slice() {
        let kps = [Keypoint::new(KeypointIndex::Nose, 0.0, 0.0, 1.0)];
        assert!(adjacent_keypoints(&kps, 0.0).is_empty());
    }
}
