use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;

/// Leveled complexity profile: category -> feature -> level.
///
/// Levels are pedagogical tiers (0 absent, 1 basic, 2 parameterized, 3
/// advanced), not raw counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeFeatures(BTreeMap<String, BTreeMap<String, i32>>);

impl CodeFeatures {
    /// Every configured feature at level 0.
    pub fn zeroed(config: &AnalyzerConfig) -> Self {
        let mut levels = BTreeMap::new();
        for category in &config.feature_categories {
            let features = category.features.iter().map(|f| (f.clone(), 0)).collect();
            levels.insert(category.name.clone(), features);
        }
        Self(levels)
    }

    /// Build a profile from explicit `(category, feature, level)` triples.
    pub fn from_levels(levels: &[(&str, &str, i32)]) -> Self {
        let mut features = Self::default();
        for (category, feature, level) in levels {
            features.set(category, feature, *level);
        }
        features
    }

    pub fn get(&self, category: &str, feature: &str) -> i32 {
        self.0
            .get(category)
            .and_then(|c| c.get(feature))
            .copied()
            .unwrap_or(0)
    }

    pub fn set(&mut self, category: &str, feature: &str, level: i32) {
        self.0
            .entry(category.to_string())
            .or_default()
            .insert(feature.to_string(), level);
    }

    /// Raise a feature to at least `level`, locating its category in config.
    /// Features absent from the category table are ignored.
    pub fn raise(&mut self, config: &AnalyzerConfig, feature: &str, level: i32) {
        if let Some(category) = config.category_of(feature) {
            let current = self.get(category, feature);
            if level > current {
                self.set(category, feature, level);
            }
        }
    }

    /// Level of a feature wherever it is configured.
    pub fn level_of(&self, config: &AnalyzerConfig, feature: &str) -> i32 {
        config.category_of(feature).map_or(0, |c| self.get(c, feature))
    }

    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, _, level)| level == 0)
    }

    /// Sum of positive levels, excluding the `errors` category.
    pub fn breadth(&self) -> i32 {
        self.iter()
            .filter(|(category, _, level)| *category != "errors" && *level > 0)
            .map(|(_, _, level)| level)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, i32)> {
        self.0.iter().flat_map(|(category, features)| {
            features
                .iter()
                .map(move |(feature, level)| (category.as_str(), feature.as_str(), *level))
        })
    }

    pub fn categories(&self) -> &BTreeMap<String, BTreeMap<String, i32>> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_covers_config_table() {
        let config = AnalyzerConfig::default();
        let features = CodeFeatures::zeroed(&config);
        assert!(features.is_zero());
        assert_eq!(features.categories().len(), config.feature_categories.len());
        assert_eq!(features.categories()["iteration"].len(), 5);
    }

    #[test]
    fn test_raise_never_lowers() {
        let config = AnalyzerConfig::default();
        let mut features = CodeFeatures::zeroed(&config);
        features.raise(&config, "conditionals", 2);
        features.raise(&config, "conditionals", 1);
        features.raise(&config, "notConfigured", 3);
        assert_eq!(features.get("conditionals", "conditionals"), 2);
        assert_eq!(features.level_of(&config, "notConfigured"), 0);
    }

    #[test]
    fn test_breadth_skips_errors() {
        let features = CodeFeatures::from_levels(&[
            ("errors", "errors", 1),
            ("variables", "variables", 2),
            ("functions", "repeatExecution", 1),
        ]);
        assert_eq!(features.breadth(), 3);
    }
}
