use crate::models::{ExtractionRules, OcrResult, ValidationIssue, ValidationIssueType};
use log::debug;

/// Raises review warnings against an extraction result.
///
/// Warnings never reject a payment; they tell the reviewer which fields to
/// double-check before confirming.
pub struct PaymentValidator;

impl PaymentValidator {
    pub fn validate(
        result: &OcrResult,
        expected_amount: Option<f64>,
        rules: &ExtractionRules,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        match &result.reference_number {
            None => issues.push(ValidationIssue {
                issue_type: ValidationIssueType::MissingReference,
                message: "Reference number not detected".to_string(),
            }),
            Some(reference) => {
                let length = reference.chars().filter(|c| !c.is_whitespace()).count();
                if length < rules.min_reference_length {
                    issues.push(ValidationIssue {
                        issue_type: ValidationIssueType::ShortReference,
                        message: "Reference number seems too short".to_string(),
                    });
                }
            }
        }

        match (expected_amount, result.amount) {
            (Some(expected), _) if expected <= 0.0 => {
                debug!("Ignoring non-positive expected amount {}", expected);
            }
            (Some(expected), Some(amount)) => {
                if (amount - expected).abs() / expected > rules.amount_tolerance {
                    issues.push(ValidationIssue {
                        issue_type: ValidationIssueType::AmountMismatch,
                        message: format!(
                            "Amount mismatch: detected ₱{}, expected ₱{}",
                            amount, expected
                        ),
                    });
                }
            }
            (Some(_), None) => issues.push(ValidationIssue {
                issue_type: ValidationIssueType::MissingAmount,
                message: "Amount not detected".to_string(),
            }),
            (None, _) => {}
        }

        if result.confidence < rules.min_confidence {
            issues.push(ValidationIssue {
                issue_type: ValidationIssueType::LowConfidence,
                message: format!(
                    "Low confidence ({:.0}%) - please verify manually",
                    result.confidence
                ),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;

    fn result(reference: Option<&str>, amount: Option<f64>, confidence: f64) -> OcrResult {
        OcrResult {
            reference_number: reference.map(str::to_string),
            amount,
            confidence,
            raw_text: String::new(),
            method: PaymentMethod::Gcash,
        }
    }

    fn types(issues: &[ValidationIssue]) -> Vec<ValidationIssueType> {
        issues.iter().map(|i| i.issue_type).collect()
    }

    #[test]
    fn test_clean_result_has_no_warnings() {
        let r = result(Some("9034 661 904149"), Some(3000.0), 90.0);
        let issues = PaymentValidator::validate(&r, Some(3000.0), &ExtractionRules::default());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_missing_reference() {
        let r = result(None, Some(3000.0), 90.0);
        let issues = PaymentValidator::validate(&r, None, &ExtractionRules::default());
        assert_eq!(types(&issues), vec![ValidationIssueType::MissingReference]);
        assert_eq!(issues[0].message, "Reference number not detected");
    }

    #[test]
    fn test_short_reference_ignores_spaces() {
        let r = result(Some("12 34 5"), Some(3000.0), 90.0);
        let issues = PaymentValidator::validate(&r, None, &ExtractionRules::default());
        assert_eq!(types(&issues), vec![ValidationIssueType::ShortReference]);
        assert_eq!(issues[0].message, "Reference number seems too short");
    }

    #[test]
    fn test_amount_mismatch_beyond_tolerance() {
        let r = result(Some("9034 661 904149"), Some(3500.0), 90.0);
        let issues = PaymentValidator::validate(&r, Some(3000.0), &ExtractionRules::default());
        assert_eq!(types(&issues), vec![ValidationIssueType::AmountMismatch]);
        assert_eq!(issues[0].message, "Amount mismatch: detected ₱3500, expected ₱3000");
    }

    #[test]
    fn test_amount_within_tolerance() {
        let r = result(Some("9034 661 904149"), Some(3250.0), 90.0);
        let issues = PaymentValidator::validate(&r, Some(3000.0), &ExtractionRules::default());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_missing_amount_only_with_expectation() {
        let r = result(Some("9034 661 904149"), None, 90.0);
        let rules = ExtractionRules::default();
        assert!(PaymentValidator::validate(&r, None, &rules).is_empty());
        let issues = PaymentValidator::validate(&r, Some(500.0), &rules);
        assert_eq!(types(&issues), vec![ValidationIssueType::MissingAmount]);
        assert_eq!(issues[0].message, "Amount not detected");
    }

    #[test]
    fn test_low_confidence() {
        let r = result(Some("9034 661 904149"), Some(3000.0), 45.4);
        let issues = PaymentValidator::validate(&r, None, &ExtractionRules::default());
        assert_eq!(types(&issues), vec![ValidationIssueType::LowConfidence]);
        assert_eq!(issues[0].message, "Low confidence (45%) - please verify manually");
    }

    #[test]
    fn test_empty_result_collects_every_warning() {
        let issues =
            PaymentValidator::validate(&OcrResult::empty(), Some(100.0), &ExtractionRules::default());
        assert_eq!(
            types(&issues),
            vec![
                ValidationIssueType::MissingReference,
                ValidationIssueType::MissingAmount,
                ValidationIssueType::LowConfidence,
            ]
        );
    }
}
