/// Tunable constants of the scoring policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// A joint is usable only when its confidence is strictly above this.
    pub min_confidence: f64,

    /// Flat score for any angle inside the acceptable range.
    pub in_range_accuracy: f64,

    /// Highest score reachable outside the range, reached at the range edges.
    pub partial_ceiling: f64,

    /// Score reported when no side has all of its joints in view.
    pub low_confidence_accuracy: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            in_range_accuracy: 90.0,
            partial_ceiling: 70.0,
            low_confidence_accuracy: 10.0,
        }
    }
}
