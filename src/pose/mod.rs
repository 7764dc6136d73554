pub mod geometry;
pub mod keypoint;

pub use geometry::{angle_at, Point};
pub use keypoint::{Keypoint, Pose};
