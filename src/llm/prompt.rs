//! Prompt templates for the pricing advisor.

use super::AdvisoryRequest;

/// System prompt: role, rules, and the exact JSON shape expected back.
pub fn system_prompt() -> &'static str {
    "You are a revenue manager for short-term rental properties. \
     You suggest nightly price adjustments for specific dates.\n\n\
     RULES:\n\
     1. Only price the properties and dates you are given.\n\
     2. Only suggest a date when the price should differ from the base price.\n\
     3. Prices are whole units of the property's currency.\n\
     4. factors must be chosen from: weekend, demand, holiday, last_minute, occupancy, seasonal.\n\
     5. confidence is an integer from 60 to 95.\n\
     6. Respond with ONLY a JSON object, no prose and no code fences, in exactly this shape:\n\
     {\"suggestions\": [{\"property_id\": \"...\", \"date\": \"YYYY-MM-DD\", \
     \"suggested_price\": 0, \"reasoning\": \"...\", \"confidence\": 0, \"factors\": [\"...\"]}]}"
}

/// User prompt listing the properties and the dates in the horizon.
pub fn build_prompt(request: &AdvisoryRequest) -> String {
    let mut prompt = String::with_capacity(1000 + request.properties.len() * 200);

    prompt.push_str(&format!("TODAY: {}\n", request.today.format("%Y-%m-%d (%A)")));
    prompt.push_str("DATES:\n");
    for date in &request.horizon {
        prompt.push_str(&format!("- {}\n", date.format("%Y-%m-%d (%A)")));
    }

    prompt.push_str("\nPROPERTIES:\n");
    for p in &request.properties {
        let base = p.base_price.unwrap_or_default();
        prompt.push_str(&format!("- id: {} | name: \"{}\" | base: {} {}", p.id, p.name, base, p.currency));
        if let Some(location) = &p.location {
            prompt.push_str(&format!(" | location: {location}"));
        }
        if let Some(kind) = &p.property_type {
            prompt.push_str(&format!(" | type: {kind}"));
        }
        if !p.amenities.is_empty() {
            prompt.push_str(&format!(" | amenities: {}", p.amenities.join(", ")));
        }
        prompt.push('\n');
    }

    prompt.push_str("\nReturn the JSON object now.\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Property;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_system_prompt_mentions_contract() {
        let s = system_prompt();
        assert!(s.contains("\"suggestions\""));
        assert!(s.contains("last_minute"));
        assert!(s.contains("60 to 95"));
    }

    #[test]
    fn test_build_prompt() {
        let mut p = Property::sample("villa-7", dec!(180));
        p.name = "Cliff Villa".into();
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let req = AdvisoryRequest::new(&[p], today, 3);
        let prompt = build_prompt(&req);

        assert!(prompt.contains("TODAY: 2025-07-01 (Tuesday)"));
        assert!(prompt.contains("- 2025-07-04 (Friday)"));
        assert!(!prompt.contains("2025-07-05"));
        assert!(prompt.contains("id: villa-7"));
        assert!(prompt.contains("\"Cliff Villa\""));
        assert!(prompt.contains("base: 180 USD"));
        assert!(prompt.contains("location: Lisbon"));
        assert!(prompt.contains("amenities: wifi"));
    }
}
