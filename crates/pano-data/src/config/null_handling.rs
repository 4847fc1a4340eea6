//! Null value handling for capture tables

use serde::{Deserialize, Serialize};

/// Null value configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullConfig {
    /// Patterns to treat as null
    pub patterns: Vec<String>,

    /// Whether to trim whitespace before checking
    pub trim_whitespace: bool,

    /// Case sensitive matching
    pub case_sensitive: bool,
}

impl Default for NullConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                String::new(), // Empty string
                "nan".to_string(),
                "NaT".to_string(),
                "null".to_string(),
                "None".to_string(),
                "N/A".to_string(),
            ],
            trim_whitespace: true,
            case_sensitive: false,
        }
    }
}

impl NullConfig {
    /// Check if a value should be treated as null
    pub fn is_null(&self, value: &str) -> bool {
        let test_value = if self.trim_whitespace {
            value.trim()
        } else {
            value
        };

        self.patterns.iter().any(|pattern| {
            if self.case_sensitive {
                test_value == pattern
            } else {
                test_value.eq_ignore_ascii_case(pattern)
            }
        })
    }

    /// The value itself (trimmed if configured), or `None` when it is null
    pub fn present<'a>(&self, value: Option<&'a str>) -> Option<&'a str> {
        let value = value?;
        if self.is_null(value) {
            return None;
        }
        Some(if self.trim_whitespace { value.trim() } else { value })
    }
}
