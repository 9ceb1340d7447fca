use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::PaymentProofError;

/// Payment channel a proof-of-payment screenshot was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Gcash,
    Maya,
    Bank,
    Unknown,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Gcash => "gcash",
            PaymentMethod::Maya => "maya",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != PaymentMethod::Unknown
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gcash" => Ok(PaymentMethod::Gcash),
            "maya" | "paymaya" => Ok(PaymentMethod::Maya),
            "bank" => Ok(PaymentMethod::Bank),
            "unknown" => Ok(PaymentMethod::Unknown),
            other => Err(PaymentProofError::Config(format!(
                "Unknown payment method: {}",
                other
            ))),
        }
    }
}

/// Structured result of reading one payment-proof image.
///
/// Built once per image and handed to the review form; only the
/// human-confirmed fields are persisted by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    pub reference_number: Option<String>,
    pub amount: Option<f64>,
    pub confidence: f64,
    pub raw_text: String,
    pub method: PaymentMethod,
}

impl OcrResult {
    /// The "nothing recognized" result every failure path degrades to.
    pub fn empty() -> Self {
        OcrResult {
            reference_number: None,
            amount: None,
            confidence: 0.0,
            raw_text: String::new(),
            method: PaymentMethod::Unknown,
        }
    }
}

/// Raw engine output: recognized text plus the engine's own 0-100 confidence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recognition {
    pub text: String,
    pub confidence: f64,
}

impl Recognition {
    pub fn empty() -> Self {
        Recognition::default()
    }

    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Recognition {
            text: text.into(),
            confidence: confidence.clamp(0.0, 100.0),
        }
    }
}

/// Fields pulled out of recognized text, before confidence scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub amount: Option<f64>,
    /// The reference matched the Maya hex-triple shape.
    pub strong_reference: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssueType {
    MissingReference,
    ShortReference,
    MissingAmount,
    AmountMismatch,
    LowConfidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub issue_type: ValidationIssueType,
    pub message: String,
}

/// An `OcrResult` together with the review warnings raised against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProofReport {
    pub result: OcrResult,
    pub warnings: Vec<ValidationIssue>,
}

impl PaymentProofReport {
    pub fn needs_review(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn warning_messages(&self) -> Vec<&str> {
        self.warnings.iter().map(|w| w.message.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trips_through_display() {
        for method in [
            PaymentMethod::Gcash,
            PaymentMethod::Maya,
            PaymentMethod::Bank,
            PaymentMethod::Unknown,
        ] {
            assert_eq!(method.to_string().parse::<PaymentMethod>().unwrap(), method);
        }
        assert_eq!("PayMaya".parse::<PaymentMethod>().unwrap(), PaymentMethod::Maya);
        assert!("cash".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_result_serializes_with_camel_case_fields() {
        let result = OcrResult {
            reference_number: Some("9034 661 904149".to_string()),
            amount: Some(3000.0),
            confidence: 92.0,
            raw_text: "Ref. No. 9034 661 904149".to_string(),
            method: PaymentMethod::Gcash,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["referenceNumber"], "9034 661 904149");
        assert_eq!(json["method"], "gcash");
        assert_eq!(json["rawText"], "Ref. No. 9034 661 904149");
    }

    #[test]
    fn test_recognition_confidence_is_clamped() {
        assert_eq!(Recognition::new("x", -1.0).confidence, 0.0);
        assert_eq!(Recognition::new("x", 140.0).confidence, 100.0);
    }
}
