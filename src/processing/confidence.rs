use crate::models::{ExtractionRules, PaymentDetails};

/// Turns the engine's native confidence into the composite score shown to
/// reviewers.
///
/// Extracted structure raises the score: a known method, a reference (more
/// for the Maya hex triple) and a positive amount each add a fixed boost.
/// Without a reference or an amount the native score is reported as is.
pub struct ConfidenceScorer {
    method_boost: f64,
    reference_boost: f64,
    strong_reference_boost: f64,
    amount_boost: f64,
    cap: f64,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(&ExtractionRules::default())
    }
}

impl ConfidenceScorer {
    pub fn new(rules: &ExtractionRules) -> Self {
        ConfidenceScorer {
            method_boost: rules.method_boost,
            reference_boost: rules.reference_boost,
            strong_reference_boost: rules.strong_reference_boost,
            amount_boost: rules.amount_boost,
            cap: rules.confidence_cap,
        }
    }

    pub fn score(&self, native: f64, details: &PaymentDetails) -> f64 {
        let native = native.clamp(0.0, 100.0);
        let has_amount = details.amount.map_or(false, |a| a > 0.0);

        if details.reference_number.is_none() && !has_amount {
            return native;
        }

        let mut score = native;
        if details.method.is_known() {
            score += self.method_boost;
        }
        if details.reference_number.is_some() {
            score += if details.strong_reference {
                self.strong_reference_boost
            } else {
                self.reference_boost
            };
        }
        if has_amount {
            score += self.amount_boost;
        }

        score.min(self.cap)
    }
}
