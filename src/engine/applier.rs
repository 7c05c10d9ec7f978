//! Suggestion applier.
//!
//! Turns an accepted suggestion into a pricing-rule record and writes it
//! through the configured sink. Failures are returned to the caller as
//! retryable storage errors; nothing is retried here.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::PricingRuleSink;
use crate::types::{PricingRuleRecord, PricingSuggestion, RuleConditions, StayRateError};

/// Rule names are capped to keep list views readable.
const MAX_RULE_NAME_LEN: usize = 100;
const RULE_NAME_PREFIX: &str = "AI Suggestion: ";

/// Build the record for a suggestion without storing it.
pub fn rule_from_suggestion(suggestion: &PricingSuggestion) -> Result<PricingRuleRecord, StayRateError> {
    let adjustment = suggestion.price_delta();
    if adjustment.is_zero() {
        return Err(StayRateError::InvalidSuggestion(format!(
            "suggestion for {} on {} does not change the price",
            suggestion.property_id, suggestion.date
        )));
    }

    Ok(PricingRuleRecord {
        id: Uuid::new_v4(),
        property_id: suggestion.property_id.clone(),
        rule_type: suggestion.rule_type,
        rule_name: rule_name(&suggestion.reasoning),
        conditions: RuleConditions {
            dates: vec![suggestion.date],
            original_price: suggestion.current_price,
            confidence: suggestion.confidence,
            factors: suggestion.factors.clone(),
        },
        price_adjustment: adjustment,
        is_percentage: false,
        is_active: true,
        created_at: Utc::now(),
    })
}

fn rule_name(reasoning: &str) -> String {
    let name = format!("{RULE_NAME_PREFIX}{}", reasoning.trim());
    if name.chars().count() <= MAX_RULE_NAME_LEN {
        name
    } else {
        name.chars().take(MAX_RULE_NAME_LEN).collect()
    }
}

pub struct SuggestionApplier {
    sink: Arc<dyn PricingRuleSink>,
}

impl SuggestionApplier {
    pub fn new(sink: Arc<dyn PricingRuleSink>) -> Self {
        Self { sink }
    }

    /// Persist an accepted suggestion as a pricing rule.
    pub async fn apply(&self, suggestion: &PricingSuggestion) -> Result<PricingRuleRecord> {
        let record = rule_from_suggestion(suggestion)?;

        if let Err(e) = self.sink.insert_rule(&record).await {
            warn!(
                property_id = %record.property_id,
                date = %suggestion.date,
                error = %e,
                "Failed to apply suggestion"
            );
            return Err(match e.downcast::<StayRateError>() {
                Ok(domain) => domain.into(),
                Err(other) => StayRateError::Storage(other.to_string()).into(),
            });
        }

        info!(
            rule_id = %record.id,
            property_id = %record.property_id,
            date = %suggestion.date,
            adjustment = %record.price_adjustment,
            rule_type = %record.rule_type,
            "Suggestion applied"
        );
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
