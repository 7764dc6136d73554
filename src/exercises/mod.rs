pub mod catalog;
pub mod model;

pub use catalog::ExerciseCatalog;
pub use model::{AngleRange, AngleSpec, ExerciseDefinition, FeedbackText, Joint, Side};
