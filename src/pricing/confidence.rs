//! Confidence scoring and rule-type classification.
//!
//! Confidence is a bounded heuristic score, not a probability. It only
//! looks at which factors contributed to a suggestion.

use crate::types::{Factor, RuleType};

pub const BASE_CONFIDENCE: i64 = 75;
pub const MIN_CONFIDENCE: u8 = 60;
pub const MAX_CONFIDENCE: u8 = 95;

/// Score a factor set, clamped to `MIN_CONFIDENCE..=MAX_CONFIDENCE`.
pub fn score(factors: &[Factor], multi_factor_bonus: bool) -> u8 {
    let mut raw = BASE_CONFIDENCE;

    if factors.contains(&Factor::Weekend) {
        raw += 15;
    }
    if factors.contains(&Factor::Holiday) {
        raw += 10;
    }
    if factors.contains(&Factor::Seasonal) {
        raw += 5;
    }
    if factors.contains(&Factor::LastMinute) {
        raw -= 10;
    }
    if multi_factor_bonus && factors.len() > 2 {
        raw += 5;
    }

    clamp(raw)
}

/// Clamp any raw score (including externally supplied ones) into range.
pub fn clamp(raw: i64) -> u8 {
    raw.clamp(MIN_CONFIDENCE as i64, MAX_CONFIDENCE as i64) as u8
}

/// Pick the display category by priority:
/// weekend > seasonal > holiday > last-minute > occupancy.
pub fn classify(factors: &[Factor]) -> RuleType {
    if factors.contains(&Factor::Weekend) {
        RuleType::Weekend
    } else if factors.contains(&Factor::Seasonal) {
        RuleType::Seasonal
    } else if factors.contains(&Factor::Holiday) {
        RuleType::Event
    } else if factors.contains(&Factor::LastMinute) {
        RuleType::Demand
    } else {
        RuleType::Occupancy
    }
}
