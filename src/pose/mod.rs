pub mod generator;
pub mod keypoints;

pub use generator::{generate_frame, ExerciseKind};
pub use keypoints::{Joint, Keypoint};
