//! Strict JSON contract for advisor responses.
//!
//! Models wrap JSON in prose or code fences often enough that the
//! outermost `{ ... }` is located first. Each entry is then validated
//! against the request; invalid entries are dropped, and a response
//! with no valid entries is an error.

use std::collections::HashSet;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use tracing::debug;

use super::AdvisoryRequest;
use crate::pricing::confidence;
use crate::types::{Factor, Impact, PricingSuggestion, StayRateError, SuggestionSource};

const DEFAULT_REASONING: &str = "Advisor suggestion";
const MAX_REASONING_LEN: usize = 500;

#[derive(Debug, Deserialize)]
struct AdvisorResponse {
    suggestions: Vec<RawSuggestion>,
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    property_id: String,
    date: String,
    suggested_price: Decimal,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    factors: Vec<String>,
}

/// Slice out the outermost JSON object in `text`.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse and validate a raw advisor response.
pub fn parse_suggestions(text: &str, request: &AdvisoryRequest) -> Result<Vec<PricingSuggestion>> {
    let json = extract_json(text)
        .ok_or_else(|| StayRateError::InvalidSuggestion("no JSON object in advisor response".into()))?;

    let response: AdvisorResponse = serde_json::from_str(json)
        .map_err(|e| StayRateError::InvalidSuggestion(format!("advisor JSON does not match contract: {e}")))?;

    let total = response.suggestions.len();
    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(total);

    for raw in response.suggestions {
        match validate(raw, request) {
            Ok(s) => {
                if seen.insert((s.property_id.clone(), s.date)) {
                    valid.push(s);
                } else {
                    debug!(property_id = %s.property_id, date = %s.date, "Duplicate advisor suggestion dropped");
                }
            }
            Err(reason) => debug!(%reason, "Advisor suggestion rejected"),
        }
    }

    if valid.is_empty() {
        return Err(StayRateError::InvalidSuggestion(format!(
            "none of {total} advisor suggestions passed validation"
        ))
        .into());
    }

    debug!(valid = valid.len(), total, "Advisor response parsed");
    Ok(valid)
}

/// Check one entry against the request and build the suggestion.
fn validate(raw: RawSuggestion, request: &AdvisoryRequest) -> Result<PricingSuggestion, String> {
    let property = request
        .property(&raw.property_id)
        .ok_or_else(|| format!("unknown property {}", raw.property_id))?;
    let current = property
        .nightly_rate()
        .ok_or_else(|| format!("property {} has no base price", property.id))?;

    let date = NaiveDate::parse_from_str(raw.date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("bad date {:?}: {e}", raw.date))?;
    if !request.in_horizon(date) {
        return Err(format!("date {date} outside horizon"));
    }

    let suggested = raw
        .suggested_price
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    if suggested <= Decimal::ZERO {
        return Err(format!("non-positive price {suggested}"));
    }
    if suggested == current {
        return Err(format!("price {suggested} equals base price"));
    }

    let mut factors = Vec::with_capacity(raw.factors.len());
    for tag in &raw.factors {
        let factor: Factor = tag.parse().map_err(|e| format!("{e}"))?;
        if !factors.contains(&factor) {
            factors.push(factor);
        }
    }
    if factors.is_empty() {
        return Err("no factors given".to_string());
    }

    let confidence = match raw.confidence {
        // Fractions like 0.85 are read as percentages
        Some(c) if c.is_finite() && c <= 1.0 => confidence::clamp((c * 100.0).round() as i64),
        Some(c) if c.is_finite() => confidence::clamp(c.round() as i64),
        _ => confidence::score(&factors, true),
    };

    let reasoning = match raw.reasoning.trim() {
        "" => DEFAULT_REASONING.to_string(),
        r if r.len() > MAX_REASONING_LEN => {
            let cut = r
                .char_indices()
                .map(|(i, _)| i)
                .take_while(|i| *i <= MAX_REASONING_LEN)
                .last()
                .unwrap_or(0);
            r[..cut].to_string()
        }
        r => r.to_string(),
    };

    Ok(PricingSuggestion {
        property_id: property.id.clone(),
        property_name: property.name.clone(),
        date,
        current_price: current,
        suggested_price: suggested,
        currency: property.currency.clone(),
        rule_type: confidence::classify(&factors),
        factors,
        reasoning,
        confidence,
        impact: Impact::from_delta(suggested - current),
        source: SuggestionSource::Advisor,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Property, RuleType};
    use rust_decimal_macros::dec;

    fn request() -> AdvisoryRequest {
        let props = vec![Property::sample("p1", dec!(100)), Property::sample("p2", dec!(250))];
        AdvisoryRequest::new(&props, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(), 14)
    }

    #[test]
    fn test_extract_json_from_fenced_text() {
        let text = "Sure! Here you go:\n```json\n{\"suggestions\": []}\n```\nGood luck.";
        assert_eq!(extract_json(text), Some("{\"suggestions\": []}"));
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_valid_response() {
        let text = r#"{"suggestions": [
            {"property_id": "p1", "date": "2025-07-04", "suggested_price": 145,
             "reasoning": "Independence Day weekend", "confidence": 90,
             "factors": ["weekend", "holiday"]},
            {"property_id": "p2", "date": "2025-07-02", "suggested_price": 224.6,
             "reasoning": "Soft midweek demand", "confidence": 0.7,
             "factors": ["last_minute", "occupancy"]}
        ]}"#;
        let out = parse_suggestions(text, &request()).unwrap();
        assert_eq!(out.len(), 2);

        assert_eq!(out[0].suggested_price, dec!(145));
        assert_eq!(out[0].impact, Impact::Increase);
        assert_eq!(out[0].rule_type, RuleType::Weekend);
        assert_eq!(out[0].confidence, 90);
        assert_eq!(out[0].source, SuggestionSource::Advisor);

        assert_eq!(out[1].suggested_price, dec!(225));
        assert_eq!(out[1].impact, Impact::Decrease);
        assert_eq!(out[1].rule_type, RuleType::Demand);
        assert_eq!(out[1].confidence, 70);
    }

    #[test]
    fn test_confidence_clamped_and_defaulted() {
        let text = r#"{"suggestions": [
            {"property_id": "p1", "date": "2025-07-04", "suggested_price": 150, "confidence": 100, "factors": ["weekend"]},
            {"property_id": "p1", "date": "2025-07-05", "suggested_price": 150, "confidence": 12, "factors": ["weekend"]},
            {"property_id": "p1", "date": "2025-07-08", "suggested_price": 110, "factors": ["seasonal"]}
        ]}"#;
        let out = parse_suggestions(text, &request()).unwrap();
        assert_eq!(out[0].confidence, 95);
        assert_eq!(out[1].confidence, 60);
        assert_eq!(out[2].confidence, 80);
        assert_eq!(out[2].reasoning, DEFAULT_REASONING);
    }

    #[test]
    fn test_invalid_entries_dropped() {
        let text = r#"{"suggestions": [
            {"property_id": "ghost", "date": "2025-07-04", "suggested_price": 150, "factors": ["weekend"]},
            {"property_id": "p1", "date": "2025-07-01", "suggested_price": 150, "factors": ["weekend"]},
            {"property_id": "p1", "date": "2025-08-30", "suggested_price": 150, "factors": ["weekend"]},
            {"property_id": "p1", "date": "July 4th", "suggested_price": 150, "factors": ["weekend"]},
            {"property_id": "p1", "date": "2025-07-04", "suggested_price": 100.2, "factors": ["weekend"]},
            {"property_id": "p1", "date": "2025-07-04", "suggested_price": -3, "factors": ["weekend"]},
            {"property_id": "p1", "date": "2025-07-04", "suggested_price": 150, "factors": ["competitors"]},
            {"property_id": "p1", "date": "2025-07-04", "suggested_price": 150, "factors": []},
            {"property_id": "p2", "date": "2025-07-05", "suggested_price": 300, "factors": ["weekend"]},
            {"property_id": "p2", "date": "2025-07-05", "suggested_price": 310, "factors": ["weekend"]}
        ]}"#;
        let out = parse_suggestions(text, &request()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].property_id, "p2");
        assert_eq!(out[0].suggested_price, dec!(300));
    }

    #[test]
    fn test_no_valid_entries_is_error() {
        let text = r#"{"suggestions": [{"property_id": "ghost", "date": "2025-07-04", "suggested_price": 1, "factors": ["weekend"]}]}"#;
        assert!(parse_suggestions(text, &request()).is_err());
        assert!(parse_suggestions(r#"{"suggestions": []}"#, &request()).is_err());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(parse_suggestions("I think you should raise prices.", &request()).is_err());
        assert!(parse_suggestions("{\"suggestions\": [ {\"property_id\": ", &request()).is_err());
        assert!(parse_suggestions(r#"{"recommendations": []}"#, &request()).is_err());
    }

    #[test]
    fn test_long_reasoning_truncated() {
        let long = "x".repeat(MAX_REASONING_LEN * 2);
        let text = format!(
            r#"{{"suggestions": [{{"property_id": "p1", "date": "2025-07-04", "suggested_price": 150, "reasoning": "{long}", "factors": ["weekend"]}}]}}"#
        );
        let out = parse_suggestions(&text, &request()).unwrap();
        assert!(out[0].reasoning.len() <= MAX_REASONING_LEN);
    }
}
