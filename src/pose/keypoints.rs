use serde::{Deserialize, Serialize};

/// The 17 body joints reported in every frame, in COCO order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Joint {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub const COUNT: usize = 17;

    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::Nose,
        Joint::LeftEye,
        Joint::RightEye,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftEye => "leftEye",
            Joint::RightEye => "rightEye",
            Joint::LeftEar => "leftEar",
            Joint::RightEar => "rightEar",
            Joint::LeftShoulder => "leftShoulder",
            Joint::RightShoulder => "rightShoulder",
            Joint::LeftElbow => "leftElbow",
            Joint::RightElbow => "rightElbow",
            Joint::LeftWrist => "leftWrist",
            Joint::RightWrist => "rightWrist",
            Joint::LeftHip => "leftHip",
            Joint::RightHip => "rightHip",
            Joint::LeftKnee => "leftKnee",
            Joint::RightKnee => "rightKnee",
            Joint::LeftAnkle => "leftAnkle",
            Joint::RightAnkle => "rightAnkle",
        }
    }

    /// Resting position relative to the frame center, in pixels (y grows downward).
    pub fn base_offset(&self) -> (f64, f64) {
        match self {
            Joint::Nose => (0.0, -180.0),
            Joint::LeftEye => (-15.0, -195.0),
            Joint::RightEye => (15.0, -195.0),
            Joint::LeftEar => (-30.0, -185.0),
            Joint::RightEar => (30.0, -185.0),
            Joint::LeftShoulder => (-60.0, -120.0),
            Joint::RightShoulder => (60.0, -120.0),
            Joint::LeftElbow => (-80.0, -40.0),
            Joint::RightElbow => (80.0, -40.0),
            Joint::LeftWrist => (-90.0, 30.0),
            Joint::RightWrist => (90.0, 30.0),
            Joint::LeftHip => (-40.0, 20.0),
            Joint::RightHip => (40.0, 20.0),
            Joint::LeftKnee => (-45.0, 120.0),
            Joint::RightKnee => (45.0, 120.0),
            Joint::LeftAnkle => (-50.0, 220.0),
            Joint::RightAnkle => (50.0, 220.0),
        }
    }

    /// Fixed detection confidence. Head and torso joints score higher than extremities.
    pub fn confidence(&self) -> f64 {
        match self {
            Joint::Nose => 0.96,
            Joint::LeftEye | Joint::RightEye => 0.95,
            Joint::LeftShoulder | Joint::RightShoulder => 0.94,
            Joint::LeftHip | Joint::RightHip => 0.93,
            Joint::LeftEar | Joint::RightEar => 0.92,
            Joint::LeftElbow | Joint::RightElbow => 0.91,
            Joint::LeftKnee | Joint::RightKnee => 0.90,
            Joint::LeftWrist | Joint::RightWrist => 0.88,
            Joint::LeftAnkle | Joint::RightAnkle => 0.87,
        }
    }

    pub fn is_right_side(&self) -> bool {
        matches!(
            self,
            Joint::RightEye
                | Joint::RightEar
                | Joint::RightShoulder
                | Joint::RightElbow
                | Joint::RightWrist
                | Joint::RightHip
                | Joint::RightKnee
                | Joint::RightAnkle
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Keypoint {
    pub joint_name: Joint,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}
