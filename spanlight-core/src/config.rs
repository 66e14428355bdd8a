use serde::{Deserialize, Serialize};

/// Per-field annotation policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Keep spans that intersect each other instead of superseding them
    pub allow_overlap: bool,
    /// Take selections verbatim instead of snapping them to word boundaries
    pub allow_character: bool,
    /// Base line height of the field, in host units
    pub line_height: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            allow_overlap: false,
            allow_character: false,
            line_height: 32.0,
        }
    }
}

/// How stacked spans grow the field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    /// Vertical distance between two overlap lanes
    pub level_gap: f64,
    /// Number of lanes that fit inside the base line height
    pub level_threshold: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            level_gap: 10.0,
            level_threshold: 1,
        }
    }
}

impl LayoutOptions {
    /// Line height needed so `max_level` lanes never clip.
    pub fn line_height(&self, base: f64, max_level: usize) -> f64 {
        let extra = max_level.saturating_sub(self.level_threshold);
        base + self.level_gap * extra as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_defaults_from_partial_json() {
        let config: Configuration = serde_json::from_str(r#"{"allowOverlap": true}"#).unwrap();
        assert!(config.allow_overlap);
        assert!(!config.allow_character);
        assert_eq!(config.line_height, 32.0);
    }

    #[test]
    fn test_line_height_grows_past_threshold() {
        let options = LayoutOptions {
            level_gap: 10.0,
            level_threshold: 2,
        };
        assert_eq!(options.line_height(32.0, 0), 32.0);
        assert_eq!(options.line_height(32.0, 2), 32.0);
        assert_eq!(options.line_height(32.0, 4), 52.0);
    }
}
