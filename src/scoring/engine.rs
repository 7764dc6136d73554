use serde::{Deserialize, Serialize};

use crate::{
    error::EngineError,
    exercises::{model::RangePosition, ExerciseCatalog, ExerciseDefinition, Side},
    pose::{angle_at, Point, Pose},
};

use super::config::ScoringConfig;

/// Outcome of scoring one pose against one exercise. Produced fresh on every call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub accuracy: f64,
    pub feedback: String,
    pub engaged: bool,
    /// Measured angle in degrees; `None` when no side was usable.
    pub angle: Option<f64>,
    pub side: Option<Side>,
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Scores `pose` for `exercise`. Never fails: a body part that cannot be seen yields
    /// the low-confidence result.
    pub fn evaluate(&self, pose: &Pose, exercise: &ExerciseDefinition) -> ScoreResult {
        match self.measure(pose, exercise) {
            Some((side, angle)) => self.score_angle(angle, side, exercise),
            None => self.low_confidence(exercise),
        }
    }

    /// Resolves `exercise_id` first; an unknown id produces no score at all.
    pub fn evaluate_by_id(
        &self,
        catalog: &ExerciseCatalog,
        exercise_id: &str,
        pose: &Pose,
    ) -> Result<ScoreResult, EngineError> {
        let exercise = catalog.get(exercise_id)?;
        Ok(self.evaluate(pose, exercise))
    }

    /// Classifies an already measured angle against the exercise range.
    pub fn score_angle(&self, angle: f64, side: Side, exercise: &ExerciseDefinition) -> ScoreResult {
        let range = exercise.angle.acceptable;
        let ceiling = self.config.partial_ceiling;

        let (accuracy, feedback, engaged) = match range.classify(angle) {
            RangePosition::Within => (
                self.config.in_range_accuracy,
                &exercise.feedback.in_range,
                true,
            ),
            RangePosition::Below => (
                clamp_score(ceiling * (angle / range.min), ceiling),
                &exercise.feedback.below,
                false,
            ),
            RangePosition::Above => (
                clamp_score(ceiling * (2.0 - angle / range.max), ceiling),
                &exercise.feedback.above,
                false,
            ),
        };

        ScoreResult {
            accuracy,
            feedback: feedback.clone(),
            engaged,
            angle: Some(angle),
            side: Some(side),
        }
    }

    /// First side, in priority order, whose three joints are all reliably detected.
    fn measure(&self, pose: &Pose, exercise: &ExerciseDefinition) -> Option<(Side, f64)> {
        exercise.specs_by_side().find_map(|(side, spec)| {
            let [a, vertex, c] = spec
                .joints()
                .map(|joint| self.reliable_point(pose, &joint.keypoint_name(side)));
            let angle = angle_at(a?, vertex?, c?);
            angle.is_finite().then_some((side, angle))
        })
    }

    fn reliable_point(&self, pose: &Pose, name: &str) -> Option<Point> {
        pose.reliable_point(name, self.config.min_confidence)
    }

    fn low_confidence(&self, exercise: &ExerciseDefinition) -> ScoreResult {
        ScoreResult {
            accuracy: self.config.low_confidence_accuracy,
            feedback: exercise.feedback.out_of_view.clone(),
            engaged: false,
            angle: None,
            side: None,
        }
    }
}

fn clamp_score(raw: f64, ceiling: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.max(0.0).min(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Keypoint;
    use proptest::prelude::*;

    fn knee() -> ExerciseDefinition {
        ExerciseCatalog::builtin().get("knee-extension").unwrap().clone()
    }

    /// Hip, knee and ankle on `side` arranged so the knee angle is `degrees`.
    fn leg_pose(side: &str, degrees: f64, confidence: f64) -> Pose {
        let (vx, vy) = (200.0, 200.0);
        let rad = degrees.to_radians();
        Pose::new()
            .with(Keypoint::new(format!("{side}_hip"), vx + 100.0, vy, confidence))
            .with(Keypoint::new(format!("{side}_knee"), vx, vy, confidence))
            .with(Keypoint::new(
                format!("{side}_ankle"),
                vx + 100.0 * rad.cos(),
                vy + 100.0 * rad.sin(),
                confidence,
            ))
    }

    fn merge(a: Pose, b: Pose) -> Pose {
        let mut keypoints: Vec<Keypoint> = a.into();
        keypoints.extend(Vec::<Keypoint>::from(b));
        keypoints.into_iter().collect()
    }

    #[test]
    fn in_range_is_flat_ninety() {
        let engine = ScoringEngine::default();
        for degrees in [161.0, 170.0, 179.5] {
            let result = engine.evaluate(&leg_pose("left", degrees, 0.9), &knee());
            assert!(result.engaged);
            assert_eq!(result.accuracy, 90.0);
            assert_eq!(result.feedback, "Good knee extension!");
            assert_eq!(result.side, Some(Side::Left));
        }
    }

    #[test]
    fn below_range_scales_toward_seventy() {
        let engine = ScoringEngine::default();
        let result = engine.evaluate(&leg_pose("left", 120.0, 0.9), &knee());

        assert!(!result.engaged);
        assert!((result.accuracy - 52.5).abs() < 1e-6);
        assert_eq!(result.feedback, "Extend your knee more");
        assert!((result.angle.unwrap() - 120.0).abs() < 1e-6);
    }

    #[test]
    fn above_range_uses_reduce_feedback() {
        let mut exercise = ExerciseCatalog::builtin()
            .get("ankle-dorsiflexion")
            .unwrap()
            .clone();
        exercise.angle.joint_a = crate::exercises::Joint::Hip;
        exercise.angle.vertex = crate::exercises::Joint::Knee;
        exercise.angle.joint_c = crate::exercises::Joint::Ankle;

        let engine = ScoringEngine::default();
        let result = engine.evaluate(&leg_pose("left", 150.0, 0.9), &exercise);

        assert!(!result.engaged);
        assert!((result.accuracy - 35.0).abs() < 1e-6);
        assert_eq!(result.feedback, "Reduce your ankle flexion slightly");
    }

    #[test]
    fn above_range_clamps_at_zero() {
        let exercise = ExerciseCatalog::builtin()
            .get("ankle-dorsiflexion")
            .unwrap()
            .clone();
        let engine = ScoringEngine::default();

        assert_eq!(engine.score_angle(100.0, Side::Left, &exercise).accuracy, 90.0);
        assert!((engine.score_angle(100.0001, Side::Left, &exercise).accuracy - 70.0).abs() < 1e-3);
        assert_eq!(engine.score_angle(200.0, Side::Left, &exercise).accuracy, 0.0);
        assert_eq!(engine.score_angle(350.0, Side::Left, &exercise).accuracy, 0.0);
    }

    #[test]
    fn zero_angle_scores_zero() {
        let engine = ScoringEngine::default();
        assert_eq!(engine.score_angle(0.0, Side::Right, &knee()).accuracy, 0.0);
    }

    #[test]
    fn falls_back_to_right_side() {
        let engine = ScoringEngine::default();
        let pose = merge(leg_pose("left", 120.0, 0.3), leg_pose("right", 170.0, 0.8));
        let result = engine.evaluate(&pose, &knee());

        assert_eq!(result.side, Some(Side::Right));
        assert!(result.engaged);
    }

    #[test]
    fn prefers_left_when_both_sides_qualify() {
        let engine = ScoringEngine::default();
        let pose = merge(leg_pose("left", 120.0, 0.9), leg_pose("right", 170.0, 0.9));
        let result = engine.evaluate(&pose, &knee());

        assert_eq!(result.side, Some(Side::Left));
        assert!(!result.engaged);
    }

    #[test]
    fn one_weak_joint_disqualifies_the_side() {
        let engine = ScoringEngine::default();
        let mut pose = leg_pose("left", 170.0, 0.9);
        pose.insert(Keypoint::new("left_ankle", 0.0, 0.0, 0.5));
        let result = engine.evaluate(&pose, &knee());

        assert_eq!(result.accuracy, 10.0);
        assert_eq!(result.feedback, "Position your leg in camera view");
        assert!(!result.engaged);
    }

    #[test]
    fn disallowed_side_is_ignored() {
        let engine = ScoringEngine::default();
        let mut exercise = knee();
        exercise.sides = vec![Side::Left];
        let result = engine.evaluate(&leg_pose("right", 170.0, 0.9), &exercise);

        assert_eq!(result.side, None);
        assert_eq!(result.accuracy, 10.0);
    }

    #[test]
    fn low_confidence_ignores_geometry() {
        let engine = ScoringEngine::default();
        for degrees in [0.0, 90.0, 170.0, 180.0] {
            let pose = merge(leg_pose("left", degrees, 0.4), leg_pose("right", degrees, 0.4));
            let result = engine.evaluate(&pose, &knee());
            assert_eq!(result.accuracy, 10.0);
            assert!(!result.engaged);
            assert_eq!(result.angle, None);
        }
    }

    #[test]
    fn unknown_exercise_produces_no_score() {
        let engine = ScoringEngine::default();
        let catalog = ExerciseCatalog::builtin();
        let err = engine
            .evaluate_by_id(&catalog, "jumping-jack", &leg_pose("left", 170.0, 0.9))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownExercise(_)));
    }

    proptest! {
        #[test]
        fn accuracy_stays_in_bounds(
            angle in -1.0e6f64..1.0e6,
            exercise_index in 0usize..4,
        ) {
            let catalog = ExerciseCatalog::builtin();
            let exercise = catalog.iter().nth(exercise_index).unwrap();
            let result = ScoringEngine::default().score_angle(angle, Side::Left, exercise);
            prop_assert!((0.0..=100.0).contains(&result.accuracy));
        }

        #[test]
        fn evaluated_accuracy_stays_in_bounds(
            coords in proptest::collection::vec(-1.0e9f64..1.0e9, 6),
            confidences in proptest::collection::vec(0.0f64..=1.0, 3),
        ) {
            let names = ["left_hip", "left_knee", "left_ankle"];
            let pose: Pose = names
                .iter()
                .enumerate()
                .map(|(i, name)| Keypoint::new(*name, coords[2 * i], coords[2 * i + 1], confidences[i]))
                .collect();
            let result = ScoringEngine::default().evaluate(&pose, &knee());
            prop_assert!((0.0..=100.0).contains(&result.accuracy));
        }

        #[test]
        fn below_range_is_non_decreasing(a in 0.0f64..160.0, b in 0.0f64..160.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let engine = ScoringEngine::default();
            let exercise = knee();
            let low = engine.score_angle(lo, Side::Left, &exercise).accuracy;
            let high = engine.score_angle(hi, Side::Left, &exercise).accuracy;
            prop_assert!(low <= high);
        }

        #[test]
        fn above_range_is_non_increasing(a in 100.0f64..1000.0, b in 100.0f64..1000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assume!(lo > 100.0);
            let engine = ScoringEngine::default();
            let catalog = ExerciseCatalog::builtin();
            let exercise = catalog.get("ankle-dorsiflexion").unwrap();
            let near = engine.score_angle(lo, Side::Left, exercise).accuracy;
            let far = engine.score_angle(hi, Side::Left, exercise).accuracy;
            prop_assert!(far <= near);
        }
    }
}
