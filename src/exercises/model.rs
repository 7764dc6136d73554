//! Exercise definitions: which joint angle to measure and what range counts as engaged.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Order in which sides are tried when both are allowed.
    pub const PRIORITY: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side-neutral joint vocabulary shared with the pose estimator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Shoulder,
    Elbow,
    Wrist,
    Hip,
    Knee,
    Ankle,
    Heel,
    FootIndex,
}

impl Joint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Joint::Shoulder => "shoulder",
            Joint::Elbow => "elbow",
            Joint::Wrist => "wrist",
            Joint::Hip => "hip",
            Joint::Knee => "knee",
            Joint::Ankle => "ankle",
            Joint::Heel => "heel",
            Joint::FootIndex => "foot_index",
        }
    }

    /// Keypoint name as emitted by the estimator, e.g. `right_foot_index`.
    pub fn keypoint_name(&self, side: Side) -> String {
        format!("{}_{}", side.as_str(), self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePosition {
    Below,
    Within,
    Above,
}

/// Inclusive acceptable range, in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

impl AngleRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn classify(&self, angle: f64) -> RangePosition {
        if angle < self.min {
            RangePosition::Below
        } else if angle > self.max {
            RangePosition::Above
        } else {
            RangePosition::Within
        }
    }
}

/// The angle at `vertex` between `joint_a` and `joint_c`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AngleSpec {
    pub joint_a: Joint,
    pub vertex: Joint,
    pub joint_c: Joint,
    pub acceptable: AngleRange,
}

impl AngleSpec {
    pub fn joints(&self) -> [Joint; 3] {
        [self.joint_a, self.vertex, self.joint_c]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackText {
    pub in_range: String,
    pub below: String,
    pub above: String,
    pub out_of_view: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub target_area: String,
    #[serde(default)]
    pub short_description: String,
    pub angle: AngleSpec,
    #[serde(default = "both_sides")]
    pub sides: Vec<Side>,
    pub feedback: FeedbackText,
}

fn both_sides() -> Vec<Side> {
    Side::PRIORITY.to_vec()
}

impl ExerciseDefinition {
    /// Allowed sides with their angle spec, in priority order.
    pub fn specs_by_side(&self) -> impl Iterator<Item = (Side, &AngleSpec)> + '_ {
        Side::PRIORITY
            .into_iter()
            .filter(move |side| self.sides.contains(side))
            .map(move |side| (side, &self.angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypoint_names_follow_estimator_vocabulary() {
        assert_eq!(Joint::FootIndex.keypoint_name(Side::Left), "left_foot_index");
        assert_eq!(Joint::Knee.keypoint_name(Side::Right), "right_knee");
    }

    #[test]
    fn range_is_inclusive() {
        let range = AngleRange::new(160.0, 180.0);
        assert_eq!(range.classify(160.0), RangePosition::Within);
        assert_eq!(range.classify(180.0), RangePosition::Within);
        assert_eq!(range.classify(159.999), RangePosition::Below);
        assert_eq!(range.classify(180.001), RangePosition::Above);
    }

    #[test]
    fn sides_are_yielded_in_priority_order() {
        let mut exercise = crate::exercises::ExerciseCatalog::builtin()
            .get("knee-extension")
            .unwrap()
            .clone();
        exercise.sides = vec![Side::Right, Side::Left];

        let order: Vec<Side> = exercise.specs_by_side().map(|(side, _)| side).collect();
        assert_eq!(order, vec![Side::Left, Side::Right]);

        exercise.sides = vec![Side::Right];
        let order: Vec<Side> = exercise.specs_by_side().map(|(side, _)| side).collect();
        assert_eq!(order, vec![Side::Right]);
    }

    #[test]
    fn unknown_joint_is_rejected_at_parse_time() {
        let json = r#"{"jointA": "hip", "vertex": "kneee", "jointC": "ankle",
                       "acceptable": {"min": 160, "max": 180}}"#;
        assert!(serde_json::from_str::<AngleSpec>(json).is_err());
    }
}
