// Payment field extraction from recognized receipt text.
// Every heuristic is a row in one of the tables below, tried in order.

use crate::models::{ExtractionRules, PaymentDetails, PaymentMethod};
use crate::processing::field_correction::{IdCorrection, MayaIdCorrection};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// A piece of text evidence pointing at one payment channel.
struct Indicator {
    name: &'static str,
    pattern: Regex,
    /// Extra check on the matched text; `None` accepts any match.
    check: Option<fn(&str) -> bool>,
}

impl Indicator {
    fn new(name: &'static str, pattern: &str) -> Self {
        Indicator {
            name,
            pattern: Regex::new(pattern).unwrap(),
            check: None,
        }
    }

    fn checked(name: &'static str, pattern: &str, check: fn(&str) -> bool) -> Self {
        Indicator {
            check: Some(check),
            ..Indicator::new(name, pattern)
        }
    }

    fn matches(&self, text: &str) -> bool {
        match self.check {
            None => self.pattern.is_match(text),
            Some(check) => self.pattern.find_iter(text).any(|m| check(m.as_str())),
        }
    }
}

/// How a captured reference candidate is validated and normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceKind {
    /// `XXXX XXXX XXXX` hex-like Maya ID with at least one letter A-F.
    MayaHexId,
    /// 6-7 digit Maya trace / InstaPay reference.
    MayaTrace,
    /// GCash digit reference, re-spaced 4-3-6 or 4-4-rest.
    GcashDigits,
    /// Bank and unknown channels: any alphanumeric token with a digit.
    Generic,
}

struct ReferenceRule {
    name: &'static str,
    pattern: Regex,
    kind: ReferenceKind,
}

impl ReferenceRule {
    fn new(name: &'static str, pattern: &str, kind: ReferenceKind) -> Self {
        ReferenceRule {
            name,
            pattern: Regex::new(pattern).unwrap(),
            kind,
        }
    }
}

struct AmountRule {
    name: &'static str,
    pattern: Regex,
}

impl AmountRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        AmountRule {
            name,
            pattern: Regex::new(pattern).unwrap(),
        }
    }
}

const NUMBER: &str = r"(\d[\d,]*(?:\.\d{1,2})?)";
/// Characters before an amount match that are checked for reference labels.
const CONTEXT_WINDOW: usize = 12;
const CURRENCY: &str = r"(?:₱|(?i:php)|P)";

lazy_static! {
    // Maya is checked before GCash: Maya receipts often carry a "GCash"
    // network label that would otherwise win.
    static ref MAYA_INDICATORS: Vec<Indicator> = vec![
        Indicator::new("instapay", r"(?i)\binsta\s?pay\b"),
        Indicator::checked(
            "maya_hex_id",
            r"\b[A-F0-9]{4}[ \t]+[A-F0-9]{4}[ \t]+[A-F0-9]{4}\b",
            contains_hex_letter,
        ),
        Indicator::new("maya_branding", r"(?i)\b(?:pay\s?)?maya\b"),
        Indicator::new("maya_field_label", r"(?i)\btrace\s*(?:number|no|#)|\breference\s+id\b"),
        Indicator::new("maya_phrasing", r"(?i)\bsent\s+money\s+via\b|\breceived\s+money\s+from\b"),
        // 6-7 digits only; 10+ digit runs are account numbers
        Indicator::new(
            "maya_trace_number",
            r"(?i)\b(?:trace|instapay\s*ref(?:erence)?)\D{0,20}?\b\d{6,7}\b",
        ),
    ];

    static ref GCASH_INDICATORS: Vec<Indicator> = vec![
        Indicator::new("gcash_branding", r"(?i)\bg\s?cash\b"),
        Indicator::new("express_send", r"(?i)\bexpress\s+send\b"),
        Indicator::new("globe_telecom", r"(?i)\bglobe\s+telecom\b"),
        Indicator::new("gcash_ref_4_3_6", r"\b\d{4}[ \t]\d{3}[ \t]\d{6}\b"),
        Indicator::new("gcash_ref_4_4_n", r"\b\d{4}[ \t]\d{4}[ \t]\d+\b"),
    ];

    static ref BANK_INDICATORS: Vec<Indicator> = vec![
        Indicator::new("bank_keyword", r"(?i)bank"),
        Indicator::new("bank_brand", r"(?i)\b(?:BDO|BPI|metrobank|unionbank)\b"),
    ];

    static ref MAYA_REFERENCE_RULES: Vec<ReferenceRule> = vec![
        ReferenceRule::new(
            "maya_id_near_trace",
            r"(?i:trace)[^\n]{0,30}?\b([A-Z0-9]{4}[ \t]+[A-Z0-9]{4}[ \t]+[A-Z0-9]{4})\b",
            ReferenceKind::MayaHexId,
        ),
        ReferenceRule::new(
            "maya_id_after_label",
            r"(?i:\b(?:reference\s+)?id\b)[\s:#.]*([A-Z0-9]{4}[ \t]+[A-Z0-9]{4}[ \t]+[A-Z0-9]{4})\b",
            ReferenceKind::MayaHexId,
        ),
        ReferenceRule::new(
            "maya_trace_number",
            r"(?i:\b(?:trace\s*(?:number|no\.?|#)?|instapay\s*ref(?:erence)?\.?\s*(?:no\.?)?))[\s:#.]*(\d{6,7})\b",
            ReferenceKind::MayaTrace,
        ),
        ReferenceRule::new(
            "maya_id_anywhere",
            r"\b([A-Z0-9]{4}[ \t]+[A-Z0-9]{4}[ \t]+[A-Z0-9]{4})\b",
            ReferenceKind::MayaHexId,
        ),
    ];

    static ref GCASH_REFERENCE_RULES: Vec<ReferenceRule> = vec![
        ReferenceRule::new(
            "gcash_labeled_ref",
            r"(?i:\bref(?:erence)?\.?\s*(?:number|no|#)\.?)[\s:#.]*(\d[\d \t]{8,16}\d)",
            ReferenceKind::GcashDigits,
        ),
        ReferenceRule::new(
            "gcash_4_3_6",
            r"\b(\d{4}[ \t]?\d{3}[ \t]?\d{6})\b",
            ReferenceKind::GcashDigits,
        ),
        ReferenceRule::new(
            "gcash_4_4_n",
            r"\b(\d{4}[ \t]\d{4}[ \t]\d{1,4})\b",
            ReferenceKind::GcashDigits,
        ),
        ReferenceRule::new("gcash_continuous", r"\b(\d{10,13})\b", ReferenceKind::GcashDigits),
    ];

    static ref GENERIC_REFERENCE_RULES: Vec<ReferenceRule> = vec![
        ReferenceRule::new(
            "labeled_reference",
            r"(?i:\b(?:reference|confirmation|transaction|ref)(?:\s*(?:number|no|code|id))?\.?)[\s:#.]*([A-Z0-9][A-Z0-9-]{5,})",
            ReferenceKind::Generic,
        ),
        ReferenceRule::new(
            "grouped_digits",
            r"\b(\d{3,4}(?:[ \t-]\d{3,6}){2,3})\b",
            ReferenceKind::Generic,
        ),
        ReferenceRule::new("long_digit_run", r"\b(\d{8,})\b", ReferenceKind::Generic),
    ];

    static ref AMOUNT_RULES: Vec<AmountRule> = vec![
        AmountRule::new(
            "labeled_amount",
            &format!(
                r"(?i:\b(?:total\s+amount\s+sent|total\s+amount|amount|total))\s*:?\s*{}?\s*{}",
                CURRENCY, NUMBER
            ),
        ),
        AmountRule::new(
            "maya_sent",
            &format!(
                r"(?i:\b(?:you\s+sent|transfer\s+amount|sent))\s*:?\s*{}?\s*{}",
                CURRENCY, NUMBER
            ),
        ),
        AmountRule::new(
            "gcash_send",
            &format!(
                r"(?i:\b(?:express\s+send\s+amount|send\s+money))\s*:?\s*{}?\s*{}",
                CURRENCY, NUMBER
            ),
        ),
        AmountRule::new("currency_prefixed", &format!(r"(?:₱|(?i:php))\s*{}", NUMBER)),
        AmountRule::new("php_suffixed", &format!(r"{}\s*(?i:php)\b", NUMBER)),
    ];

    // Only consulted when nothing above produced an amount.
    static ref BARE_AMOUNT_RULE: AmountRule =
        AmountRule::new("bare_grouped", r"\b(\d{1,3}(?:,\d{3})+(?:\.\d{2})?)\b");

    static ref HEX_ID_SHAPE: Regex = Regex::new(r"^[A-F0-9]{4} [A-F0-9]{4} [A-F0-9]{4}$").unwrap();
    static ref PRICE_LIKE: Regex = Regex::new(r"^\d{1,4}(?:\.\d{2})?$").unwrap();
    static ref REFERENCE_CONTEXT: Regex =
        Regex::new(r"(?i)\bref|\btrace\s*no|\btrace\s*number|\bid\s").unwrap();
    static ref CURRENCY_MARKER: Regex = Regex::new(r"(?i)₱|php|\bP\s?\d").unwrap();
    static ref AMOUNT_KEYWORD: Regex = Regex::new(r"(?i)amount|sent").unwrap();
}

/// Words and test values that look like references but never are.
const FALSE_POSITIVES: &[&str] = &[
    "amount", "total", "php", "gcash", "maya", "paymaya", "100000", "500000", "1000000",
];

fn contains_hex_letter(s: &str) -> bool {
    s.chars().any(|c| matches!(c, 'A'..='F'))
}

/// Result of method classification, with the indicator that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub method: PaymentMethod,
    pub evidence: Option<&'static str>,
}

/// A reference number accepted by one of the extraction rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMatch {
    pub value: String,
    /// Matched the Maya hex-triple shape.
    pub strong: bool,
    pub rule: &'static str,
}

/// Classify the payment channel: Maya, then GCash, then bank, else unknown.
pub fn classify_method(text: &str) -> Classification {
    let tables: [(PaymentMethod, &[Indicator]); 3] = [
        (PaymentMethod::Maya, MAYA_INDICATORS.as_slice()),
        (PaymentMethod::Gcash, GCASH_INDICATORS.as_slice()),
        (PaymentMethod::Bank, BANK_INDICATORS.as_slice()),
    ];

    for (method, indicators) in tables {
        if let Some(indicator) = indicators.iter().find(|i| i.matches(text)) {
            return Classification {
                method,
                evidence: Some(indicator.name),
            };
        }
    }

    Classification {
        method: PaymentMethod::Unknown,
        evidence: None,
    }
}

/// Global filter applied to every reference candidate regardless of method.
pub fn is_valid_reference(candidate: &str, min_length: usize) -> bool {
    let cleaned: String = candidate.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.chars().count() < min_length {
        return false;
    }
    if FALSE_POSITIVES.contains(&cleaned.to_lowercase().as_str()) {
        return false;
    }
    // Short prices such as "1500" or "1500.00" are amounts
    !PRICE_LIKE.is_match(&cleaned)
}

/// Parse "13,500.00" style numbers.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim_end_matches('.');
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn regroup_digits(digits: &str) -> String {
    let split = |sizes: &[usize]| {
        let mut groups = Vec::new();
        let mut start = 0;
        for &size in sizes {
            let end = (start + size).min(digits.len());
            if start < end {
                groups.push(&digits[start..end]);
            }
            start = end;
        }
        if start < digits.len() {
            groups.push(&digits[start..]);
        }
        groups.join(" ")
    };

    match digits.len() {
        13 => split(&[4, 3, 6]),
        n if n > 8 => split(&[4, 4]),
        _ => digits.to_string(),
    }
}

/// Pulls method, reference number and amount out of recognized text.
pub struct PaymentExtractor {
    rules: ExtractionRules,
    correction: Box<dyn IdCorrection>,
}

impl Default for PaymentExtractor {
    fn default() -> Self {
        Self::new(ExtractionRules::default())
    }
}

impl PaymentExtractor {
    pub fn new(rules: ExtractionRules) -> Self {
        Self::with_correction(rules, Box::new(MayaIdCorrection))
    }

    pub fn with_correction(rules: ExtractionRules, correction: Box<dyn IdCorrection>) -> Self {
        PaymentExtractor { rules, correction }
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    pub fn extract(&self, text: &str) -> PaymentDetails {
        let classification = classify_method(text);
        debug!(
            "Classified as {} (evidence: {:?})",
            classification.method, classification.evidence
        );

        let reference = self.extract_reference(text, classification.method);
        let amount = self.extract_amount(text);

        PaymentDetails {
            method: classification.method,
            strong_reference: reference.as_ref().map_or(false, |r| r.strong),
            reference_number: reference.map(|r| r.value),
            amount,
        }
    }

    /// Run the method's rule cascade; the first structurally valid candidate wins.
    pub fn extract_reference(&self, text: &str, method: PaymentMethod) -> Option<ReferenceMatch> {
        let rules: &[ReferenceRule] = match method {
            PaymentMethod::Maya => MAYA_REFERENCE_RULES.as_slice(),
            PaymentMethod::Gcash => GCASH_REFERENCE_RULES.as_slice(),
            PaymentMethod::Bank | PaymentMethod::Unknown => GENERIC_REFERENCE_RULES.as_slice(),
        };

        for rule in rules {
            for caps in rule.pattern.captures_iter(text) {
                let Some(raw) = caps.get(1) else { continue };
                let Some(value) = self.normalize_reference(raw.as_str(), rule.kind) else {
                    continue;
                };
                if !is_valid_reference(&value, self.rules.min_reference_length) {
                    continue;
                }
                debug!("Reference {:?} accepted by rule {}", value, rule.name);
                return Some(ReferenceMatch {
                    value,
                    strong: rule.kind == ReferenceKind::MayaHexId,
                    rule: rule.name,
                });
            }
        }

        None
    }

    fn normalize_reference(&self, raw: &str, kind: ReferenceKind) -> Option<String> {
        match kind {
            ReferenceKind::MayaHexId => {
                let corrected = self.correction.correct(raw);
                let collapsed = corrected.split_whitespace().collect::<Vec<_>>().join(" ");
                (HEX_ID_SHAPE.is_match(&collapsed) && contains_hex_letter(&collapsed))
                    .then_some(collapsed)
            }
            ReferenceKind::MayaTrace => {
                let digits = raw.trim();
                ((6..=7).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()))
                    .then(|| digits.to_string())
            }
            ReferenceKind::GcashDigits => {
                let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
                (9..=13)
                    .contains(&digits.len())
                    .then(|| regroup_digits(&digits))
            }
            ReferenceKind::Generic => {
                let value = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                let value = value.trim_end_matches('-').to_string();
                value.chars().any(|c| c.is_ascii_digit()).then_some(value)
            }
        }
    }

    /// Collect plausible amounts from every rule and return the most frequent.
    ///
    /// Each textual occurrence counts once; ties go to the candidate found
    /// first in rule priority order.
    pub fn extract_amount(&self, text: &str) -> Option<f64> {
        let mut seen_positions = HashSet::new();
        let mut candidates = Vec::new();

        for rule in AMOUNT_RULES.iter() {
            self.collect_amounts(rule, text, &mut seen_positions, &mut candidates);
        }
        if candidates.is_empty() {
            self.collect_amounts(&BARE_AMOUNT_RULE, text, &mut seen_positions, &mut candidates);
        }

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for value in &candidates {
            *counts.entry(Self::amount_key(*value)).or_insert(0) += 1;
        }
        let best_count = counts.values().copied().max()?;

        candidates
            .into_iter()
            .find(|v| counts[&Self::amount_key(*v)] == best_count)
    }

    fn amount_key(value: f64) -> i64 {
        (value * 100.0).round() as i64
    }

    fn collect_amounts(
        &self,
        rule: &AmountRule,
        text: &str,
        seen_positions: &mut HashSet<usize>,
        candidates: &mut Vec<f64>,
    ) {
        for caps in rule.pattern.captures_iter(text) {
            let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if seen_positions.contains(&number.start()) {
                continue;
            }
            let context = Self::match_context(text, whole.start(), whole.as_str());
            if let Some(value) = self.accept_amount(&context, number.as_str(), rule.name) {
                seen_positions.insert(number.start());
                candidates.push(value);
            }
        }
    }

    /// The match plus a few characters before it on the same line.
    fn match_context(text: &str, start: usize, matched: &str) -> String {
        let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
        let prefix = &text[line_start..start];
        let skip = prefix.chars().count().saturating_sub(CONTEXT_WINDOW);
        let mut context: String = prefix.chars().skip(skip).collect();
        context.push_str(matched);
        context
    }

    fn accept_amount(&self, context: &str, number: &str, rule: &str) -> Option<f64> {
        if REFERENCE_CONTEXT.is_match(context) {
            debug!("Skipping {:?} from {}: reference context", context, rule);
            return None;
        }

        let value = parse_amount(number)?;
        if value >= self.rules.large_amount_floor
            && value <= self.rules.large_amount_ceiling
            && !CURRENCY_MARKER.is_match(context)
            && !AMOUNT_KEYWORD.is_match(context)
        {
            debug!(
                "Skipping borderline amount {} from {}: no currency marker in {:?}",
                value, rule, context
            );
            return None;
        }

        (value > 0.0 && value < self.rules.max_amount).then_some(value)
    }
}
