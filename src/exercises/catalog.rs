//! The read-only exercise table. Adding an exercise means adding an entry here or in a
//! catalog file; scoring and rep counting never change.

use std::{collections::HashSet, fs, path::Path};

use log::info;
use serde::{Deserialize, Serialize};

use super::model::{AngleRange, AngleSpec, ExerciseDefinition, FeedbackText, Joint, Side};
use crate::error::EngineError;

pub const BUILTIN_CATALOG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawCatalog")]
pub struct ExerciseCatalog {
    version: u32,
    exercises: Vec<ExerciseDefinition>,
}

/// Catalog document as written on disk, before validation.
#[derive(Deserialize)]
struct RawCatalog {
    version: u32,
    exercises: Vec<ExerciseDefinition>,
}

impl TryFrom<RawCatalog> for ExerciseCatalog {
    type Error = EngineError;

    fn try_from(raw: RawCatalog) -> Result<Self, Self::Error> {
        Self::new(raw.version, raw.exercises)
    }
}

impl ExerciseCatalog {
    pub fn new(version: u32, exercises: Vec<ExerciseDefinition>) -> Result<Self, EngineError> {
        let catalog = Self { version, exercises };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn builtin() -> Self {
        Self {
            version: BUILTIN_CATALOG_VERSION,
            exercises: builtin_exercises(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, EngineError> {
        let raw: RawCatalog = serde_json::from_str(raw).map_err(EngineError::CatalogSyntax)?;
        Self::try_from(raw)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path).map_err(|source| EngineError::CatalogIo {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawCatalog =
            serde_json::from_str(&contents).map_err(|source| EngineError::CatalogFormat {
                path: path.to_path_buf(),
                source,
            })?;
        let catalog = Self::try_from(raw)?;

        info!(
            "Loaded exercise catalog v{} with {} exercises from {}",
            catalog.version,
            catalog.exercises.len(),
            path.display()
        );

        Ok(catalog)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Looks up an exercise. Unknown ids are a caller error and never fall back to a default.
    pub fn get(&self, id: &str) -> Result<&ExerciseDefinition, EngineError> {
        self.exercises
            .iter()
            .find(|exercise| exercise.id == id)
            .ok_or_else(|| EngineError::UnknownExercise(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExerciseDefinition> {
        self.exercises.iter()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    fn validate(&self) -> Result<(), EngineError> {
        let mut seen = HashSet::new();

        for exercise in &self.exercises {
            let id = exercise.id.as_str();
            if id.trim().is_empty() {
                return Err(EngineError::InvalidCatalog("exercise with empty id".into()));
            }
            if !seen.insert(id) {
                return Err(EngineError::InvalidCatalog(format!(
                    "duplicate exercise id '{id}'"
                )));
            }
            if exercise.sides.is_empty() {
                return Err(EngineError::InvalidCatalog(format!(
                    "exercise '{id}' allows no body side"
                )));
            }

            let AngleRange { min, max } = exercise.angle.acceptable;
            if !(min.is_finite() && max.is_finite() && 0.0 <= min && min <= max && max <= 180.0)
            {
                return Err(EngineError::InvalidCatalog(format!(
                    "exercise '{id}' has invalid range [{min}, {max}]"
                )));
            }

            let [a, vertex, c] = exercise.angle.joints();
            if a == vertex || a == c || vertex == c {
                return Err(EngineError::InvalidCatalog(format!(
                    "exercise '{id}' must measure three distinct joints"
                )));
            }
        }

        Ok(())
    }
}

impl Default for ExerciseCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn entry(
    id: &str,
    name: &str,
    target_area: &str,
    short_description: &str,
    joints: [Joint; 3],
    range: (f64, f64),
    feedback: [&str; 4],
) -> ExerciseDefinition {
    let [joint_a, vertex, joint_c] = joints;
    let [in_range, below, above, out_of_view] = feedback;

    ExerciseDefinition {
        id: id.into(),
        name: name.into(),
        target_area: target_area.into(),
        short_description: short_description.into(),
        angle: AngleSpec {
            joint_a,
            vertex,
            joint_c,
            acceptable: AngleRange::new(range.0, range.1),
        },
        sides: Side::PRIORITY.to_vec(),
        feedback: FeedbackText {
            in_range: in_range.into(),
            below: below.into(),
            above: above.into(),
            out_of_view: out_of_view.into(),
        },
    }
}

fn builtin_exercises() -> Vec<ExerciseDefinition> {
    vec![
        entry(
            "knee-extension",
            "Knee Extension",
            "Knee Recovery",
            "Strengthens quadriceps muscles to improve knee stability",
            [Joint::Hip, Joint::Knee, Joint::Ankle],
            (160.0, 180.0),
            [
                "Good knee extension!",
                "Extend your knee more",
                "Don't hyperextend your knee",
                "Position your leg in camera view",
            ],
        ),
        entry(
            "shoulder-flexion",
            "Shoulder Flexion",
            "Shoulder Mobility",
            "Improves range of motion in the shoulder joint",
            [Joint::Elbow, Joint::Shoulder, Joint::Hip],
            (160.0, 180.0),
            [
                "Great shoulder position!",
                "Raise your arm higher",
                "Don't overextend your shoulder",
                "Position your arm in camera view",
            ],
        ),
        entry(
            "hip-bridge",
            "Hip Bridge",
            "Lower Back & Hip",
            "Strengthens core, glutes, and lower back muscles",
            [Joint::Shoulder, Joint::Hip, Joint::Knee],
            (160.0, 180.0),
            [
                "Perfect hip position!",
                "Raise your hips higher",
                "Lower your hips slightly",
                "Position yourself in camera view",
            ],
        ),
        entry(
            "ankle-dorsiflexion",
            "Ankle Dorsiflexion",
            "Ankle Mobility",
            "Improves ankle flexibility and strengthens shin muscles",
            [Joint::Knee, Joint::Ankle, Joint::FootIndex],
            (80.0, 100.0),
            [
                "Good ankle flexion!",
                "Flex your ankle more",
                "Reduce your ankle flexion slightly",
                "Position your foot in camera view",
            ],
        ),
    ]
}
