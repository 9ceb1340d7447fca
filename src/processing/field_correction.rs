use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ALNUM_WITH_SPACES: Regex = Regex::new(r"^[A-Z0-9]+(?: [A-Z0-9]+)*$").unwrap();
}

/// Repairs characters a recognition engine tends to misread inside reference IDs.
///
/// Correction rules are tied to the failure modes of one engine, so they sit
/// behind a trait and can be swapped together with the engine.
pub trait IdCorrection: Send + Sync {
    fn correct(&self, candidate: &str) -> String;
}

/// Leaves candidates untouched.
pub struct NoCorrection;

impl IdCorrection for NoCorrection {
    fn correct(&self, candidate: &str) -> String {
        candidate.to_string()
    }
}

/// Contextual fixes for Maya hex-style IDs such as `8F34 1A5F 27CE`.
///
/// Within each space-separated group:
/// - `S` -> `5` and `O` -> `0` when sitting among hex characters
/// - a leading `I` -> `1` when a hex character follows
/// - `Z` -> `2` when sitting among digits
pub struct MayaIdCorrection;

impl MayaIdCorrection {
    fn is_hex(c: char) -> bool {
        matches!(c, 'A'..='F' | '0'..='9')
    }

    /// Neighbours on both sides satisfy `pred` (or are a group edge),
    /// and at least one neighbour actually exists.
    fn surrounded_by(prev: Option<char>, next: Option<char>, pred: fn(char) -> bool) -> bool {
        let left_ok = prev.map_or(true, pred);
        let right_ok = next.map_or(true, pred);
        left_ok && right_ok && (prev.is_some() || next.is_some())
    }

    fn correct_group(group: &str) -> String {
        let chars: Vec<char> = group.chars().collect();
        let mut corrected = String::with_capacity(chars.len());

        for (i, &c) in chars.iter().enumerate() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1).copied();

            let fixed = match c {
                'S' if Self::surrounded_by(prev, next, Self::is_hex) => '5',
                'O' if Self::surrounded_by(prev, next, Self::is_hex) => '0',
                'I' if i == 0 && next.map_or(false, Self::is_hex) => '1',
                'Z' if Self::surrounded_by(prev, next, |c| c.is_ascii_digit()) => '2',
                _ => c,
            };
            corrected.push(fixed);
        }

        corrected
    }
}

impl IdCorrection for MayaIdCorrection {
    fn correct(&self, candidate: &str) -> String {
        let normalized = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
        if !ALNUM_WITH_SPACES.is_match(&normalized) {
            return candidate.to_string();
        }

        normalized
            .split(' ')
            .map(Self::correct_group)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
