//! Procedural skeleton animation.
//!
//! Every frame is the fixed base skeleton displaced by two oscillations shared
//! by all joints (fast breathing, slow body sway) plus an exercise-specific
//! oscillation on the joints that exercise moves. The output depends only on
//! the exercise type and the elapsed time, so a frame can be reproduced exactly.

use std::f64::consts::PI;

use super::keypoints::{Joint, Keypoint};

pub const FRAME_WIDTH: f64 = 480.0;
pub const FRAME_HEIGHT: f64 = 640.0;

const BREATHING_AMPLITUDE: f64 = 2.0;
const BREATHING_RATE: f64 = 4.0;
const SWAY_AMPLITUDE: f64 = 6.0;
const SWAY_RATE: f64 = 0.5;

const ELBOWS: &[Joint] = &[Joint::LeftElbow, Joint::RightElbow];
const WRISTS: &[Joint] = &[Joint::LeftWrist, Joint::RightWrist];
const KNEES: &[Joint] = &[Joint::LeftKnee, Joint::RightKnee];
const ANKLES: &[Joint] = &[Joint::LeftAnkle, Joint::RightAnkle];

/// Displacement applied to a group of joints, scaled by `sin(phase)`.
#[derive(Debug, Clone, Copy)]
struct JointSwing {
    joints: &'static [Joint],
    dx: f64,
    dy: f64,
}

#[derive(Debug, Clone, Copy)]
struct Motion {
    rate: f64,
    swings: &'static [JointSwing],
    /// Right-side joints run half a cycle behind the left side.
    alternate_sides: bool,
}

const PUSH_UP: Motion = Motion {
    rate: 1.5,
    swings: &[
        JointSwing { joints: ELBOWS, dx: 0.0, dy: 50.0 },
        JointSwing { joints: WRISTS, dx: 0.0, dy: 70.0 },
    ],
    alternate_sides: false,
};

const SQUAT: Motion = Motion {
    rate: 1.2,
    swings: &[
        JointSwing { joints: KNEES, dx: 0.0, dy: 80.0 },
        JointSwing { joints: ANKLES, dx: 0.0, dy: 20.0 },
    ],
    alternate_sides: false,
};

const LUNGE: Motion = Motion {
    rate: 1.0,
    swings: &[
        JointSwing { joints: KNEES, dx: 60.0, dy: 100.0 },
        JointSwing { joints: ANKLES, dx: 20.0, dy: 30.0 },
    ],
    alternate_sides: true,
};

const BICEP_CURL: Motion = Motion {
    rate: 2.0,
    swings: &[
        JointSwing { joints: ELBOWS, dx: 0.0, dy: 80.0 },
        JointSwing { joints: WRISTS, dx: 0.0, dy: 100.0 },
    ],
    alternate_sides: false,
};

const PLANK: Motion = Motion {
    rate: 3.0,
    swings: &[
        JointSwing { joints: ELBOWS, dx: 0.0, dy: 5.0 },
        JointSwing { joints: WRISTS, dx: 0.0, dy: 5.0 },
    ],
    alternate_sides: false,
};

const IDLE_AMPLITUDE: f64 = 15.0;
const IDLE_RATE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseKind {
    PushUp,
    Squat,
    Lunge,
    BicepCurl,
    Plank,
    Other,
}

impl ExerciseKind {
    /// Case-insensitive match that ignores separators, so "Push-Up", "push_ups"
    /// and "knee pushup" all land on `PushUp`.
    pub fn classify(exercise_type: &str) -> Self {
        let normalized: String = exercise_type
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        if normalized.contains("plank") {
            ExerciseKind::Plank
        } else if normalized.contains("pushup") || normalized.contains("pressup") {
            ExerciseKind::PushUp
        } else if normalized.contains("squat") {
            ExerciseKind::Squat
        } else if normalized.contains("lunge") {
            ExerciseKind::Lunge
        } else if normalized.contains("curl") || normalized.contains("bicep") {
            ExerciseKind::BicepCurl
        } else {
            ExerciseKind::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::PushUp => "push-up",
            ExerciseKind::Squat => "squat",
            ExerciseKind::Lunge => "lunge",
            ExerciseKind::BicepCurl => "bicep-curl",
            ExerciseKind::Plank => "plank",
            ExerciseKind::Other => "other",
        }
    }

    fn motion(&self) -> Option<&'static Motion> {
        match self {
            ExerciseKind::PushUp => Some(&PUSH_UP),
            ExerciseKind::Squat => Some(&SQUAT),
            ExerciseKind::Lunge => Some(&LUNGE),
            ExerciseKind::BicepCurl => Some(&BICEP_CURL),
            ExerciseKind::Plank => Some(&PLANK),
            ExerciseKind::Other => None,
        }
    }

    /// Exercise-specific displacement of `joint` at `elapsed_secs`.
    pub fn joint_offset(&self, joint: Joint, elapsed_secs: f64) -> (f64, f64) {
        let Some(motion) = self.motion() else {
            return (0.0, IDLE_AMPLITUDE * (elapsed_secs * IDLE_RATE).sin());
        };

        let Some(swing) = motion.swings.iter().find(|s| s.joints.contains(&joint)) else {
            return (0.0, 0.0);
        };

        let mut phase = elapsed_secs * motion.rate;
        if motion.alternate_sides && joint.is_right_side() {
            phase += PI;
        }
        let s = phase.sin();
        (swing.dx * s, swing.dy * s)
    }
}

/// Breathing and sway displacement shared by every joint.
pub fn shared_offset(elapsed_secs: f64) -> (f64, f64) {
    let sway = SWAY_AMPLITUDE * (elapsed_secs * SWAY_RATE).sin();
    let breathing = BREATHING_AMPLITUDE * (elapsed_secs * BREATHING_RATE).sin();
    (sway, breathing)
}

pub fn generate_frame(exercise_type: &str, elapsed_secs: f64) -> Vec<Keypoint> {
    let kind = ExerciseKind::classify(exercise_type);
    let (shared_dx, shared_dy) = shared_offset(elapsed_secs);
    let (center_x, center_y) = (FRAME_WIDTH / 2.0, FRAME_HEIGHT / 2.0);

    Joint::ALL
        .iter()
        .map(|&joint| {
            let (base_x, base_y) = joint.base_offset();
            let (dx, dy) = kind.joint_offset(joint, elapsed_secs);
            Keypoint {
                joint_name: joint,
                x: center_x + base_x + shared_dx + dx,
                y: center_y + base_y + shared_dy + dy,
                confidence: joint.confidence(),
            }
        })
        .collect()
}
