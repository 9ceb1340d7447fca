use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::{PaymentProofError, Result};

/// Only these characters may appear in recognized text.
pub const CHARACTER_WHITELIST: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz.,₱-: ";

/// Thresholds and weights used by extraction, scoring and review warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// Amounts at or above this value need a currency marker or an
    /// amount/sent keyword, since they overlap trace-number lengths.
    pub large_amount_floor: f64,
    /// Upper bound on the "large" range guarded by `large_amount_floor`.
    pub large_amount_ceiling: f64,
    /// Exclusive upper bound for any accepted amount.
    pub max_amount: f64,
    pub min_reference_length: usize,
    pub method_boost: f64,
    pub reference_boost: f64,
    pub strong_reference_boost: f64,
    pub amount_boost: f64,
    pub confidence_cap: f64,
    /// Relative difference from the expected amount that raises a warning.
    pub amount_tolerance: f64,
    pub min_confidence: f64,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        ExtractionRules {
            large_amount_floor: 100_000.0,
            large_amount_ceiling: 9_999_999.0,
            max_amount: 1_000_000.0,
            min_reference_length: 6,
            method_boost: 10.0,
            reference_boost: 10.0,
            strong_reference_boost: 15.0,
            amount_boost: 10.0,
            confidence_cap: 99.0,
            amount_tolerance: 0.10,
            min_confidence: 60.0,
        }
    }
}

impl ExtractionRules {
    pub fn validate(&self) -> Result<()> {
        if self.max_amount <= 0.0 {
            return Err(PaymentProofError::Config(
                "max_amount must be positive".to_string(),
            ));
        }
        if self.large_amount_floor > self.large_amount_ceiling {
            return Err(PaymentProofError::Config(format!(
                "large_amount_floor ({}) exceeds large_amount_ceiling ({})",
                self.large_amount_floor, self.large_amount_ceiling
            )));
        }
        if !(0.0..=100.0).contains(&self.confidence_cap) {
            return Err(PaymentProofError::Config(format!(
                "confidence_cap must be within 0-100, got {}",
                self.confidence_cap
            )));
        }
        if self.amount_tolerance < 0.0 {
            return Err(PaymentProofError::Config(
                "amount_tolerance cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Recognition engine configuration.
///
/// The tuning variables are fixed at construction of the engine and cannot
/// be changed per call. Only the language and data location are meant to be
/// configured by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub language: String,
    pub tessdata_path: Option<String>,
    pub page_seg_mode: String,
    pub dpi: u32,
    pub class_pruner_threshold: u32,
    pub class_pruner_multiplier: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            language: "eng".to_string(),
            tessdata_path: None,
            page_seg_mode: "auto".to_string(),
            dpi: 300,
            class_pruner_threshold: 240,
            class_pruner_multiplier: 20,
        }
    }
}

impl EngineSettings {
    /// Engine variables applied once when the engine is created.
    pub fn variables(&self) -> Vec<(&'static str, String)> {
        vec![
            ("tessedit_char_whitelist", CHARACTER_WHITELIST.to_string()),
            ("classify_enable_learning", "0".to_string()),
            ("classify_enable_adaptive_matcher", "0".to_string()),
            (
                "classify_class_pruner_threshold",
                self.class_pruner_threshold.to_string(),
            ),
            (
                "classify_class_pruner_multiplier",
                self.class_pruner_multiplier.to_string(),
            ),
            ("user_defined_dpi", self.dpi.to_string()),
        ]
    }
}

/// Top-level configuration of a `PaymentProofReader`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub engine: EngineSettings,
    pub rules: ExtractionRules,
}

impl ReaderConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ReaderConfig = serde_json::from_str(json)?;
        config.rules.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PaymentProofError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config =
            ReaderConfig::from_json(r#"{ "rules": { "large_amount_floor": 250000 } }"#).unwrap();
        assert_eq!(config.rules.large_amount_floor, 250_000.0);
        assert_eq!(config.rules.min_reference_length, 6);
        assert_eq!(config.engine.language, "eng");
        assert_eq!(config.engine.dpi, 300);
    }

    #[test]
    fn test_inverted_large_amount_range_is_rejected() {
        let err = ReaderConfig::from_json(
            r#"{ "rules": { "large_amount_floor": 500, "large_amount_ceiling": 100 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, PaymentProofError::Config(_)));
    }

    #[test]
    fn test_config_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "engine": {{ "language": "eng+fil" }} }}"#).unwrap();
        let config = ReaderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.engine.language, "eng+fil");
        assert_eq!(config.rules, ExtractionRules::default());
    }

    #[test]
    fn test_missing_config_file_is_a_config_error() {
        let err = ReaderConfig::from_file("/nonexistent/payproof.json").unwrap_err();
        assert!(matches!(err, PaymentProofError::Config(_)));
    }

    #[test]
    fn test_engine_variables_disable_adaptive_learning() {
        let vars = EngineSettings::default().variables();
        let get = |name: &str| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("classify_enable_learning"), "0");
        assert_eq!(get("classify_enable_adaptive_matcher"), "0");
        assert_eq!(get("user_defined_dpi"), "300");
        assert!(get("tessedit_char_whitelist").contains('₱'));
    }
}
