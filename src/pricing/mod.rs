//! Pricing heuristic engine.
//!
//! Turns a list of properties and a reference date into ranked per-date
//! price suggestions. The engine is a pure function of its inputs and
//! configuration: no clock, no randomness, no I/O.

pub mod confidence;
pub mod rules;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};

use crate::types::{DateCandidate, Factor, Impact, PricingSuggestion, Property, SuggestionSource};
use rules::{FactorMode, ImpactOverride, PricingConfig, PricingRule, ReasonMode};

/// Reasoning used before any rule fires.
pub const BASELINE_REASON: &str = "Standard pricing maintained";

// ---------------------------------------------------------------------------
// Running adjustment
// ---------------------------------------------------------------------------

/// Accumulated effect of the rules that fired for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub multiplier: Decimal,
    pub reasons: Vec<String>,
    pub factors: Vec<Factor>,
    pub impact: Impact,
    /// Number of rules folded in so far.
    pub fired: usize,
}

impl Adjustment {
    pub fn baseline() -> Self {
        Self {
            multiplier: Decimal::ONE,
            reasons: vec![BASELINE_REASON.to_string()],
            factors: vec![Factor::Baseline],
            impact: Impact::Maintain,
            fired: 0,
        }
    }

    /// Whether no rule has fired yet.
    pub fn is_baseline(&self) -> bool {
        self.fired == 0
    }

    /// Fold one rule into the running adjustment. Extending keeps the
    /// `baseline` tag, so it still counts toward the multi-factor bonus.
    fn apply(&mut self, rule: &PricingRule, candidate: &DateCandidate) {
        let untouched = self.is_baseline();
        self.multiplier *= rule.multiplier;

        let fragment = rule.fragment(candidate);
        match rule.reason_mode {
            ReasonMode::Append if !untouched => self.reasons.push(fragment),
            _ => self.reasons = vec![fragment],
        }

        match rule.factor_mode {
            FactorMode::Replace => self.factors = rule.factors.to_vec(),
            FactorMode::Extend => {
                for f in rule.factors {
                    if !self.factors.contains(f) {
                        self.factors.push(*f);
                    }
                }
            }
        }

        match rule.impact {
            ImpactOverride::Set(impact) => self.impact = impact,
            ImpactOverride::IfMaintain(impact) => {
                if self.impact == Impact::Maintain {
                    self.impact = impact;
                }
            }
        }
        self.fired += 1;
    }

    pub fn reasoning(&self) -> String {
        self.reasons.join("; ")
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Deterministic rule-table pricing engine.
pub struct PricingEngine {
    config: PricingConfig,
    rules: Vec<PricingRule>,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        let rules = rules::rule_table(&config);
        Self { config, rules }
    }

    /// Access the engine configuration.
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Describe the date `offset` days after `today`.
    pub fn candidate(&self, today: NaiveDate, offset: u32) -> Option<DateCandidate> {
        let date = today.checked_add_days(Days::new(offset as u64))?;
        let weekday = date.weekday();
        let holiday = self.config.holidays.lookup(date);

        Some(DateCandidate {
            date,
            offset,
            weekday,
            is_weekend: matches!(weekday, Weekday::Fri | Weekday::Sat),
            is_holiday: holiday.is_some(),
            holiday_name: holiday.map(|h| h.name.clone()),
            is_last_minute: offset <= self.config.last_minute_days,
            month: date.month(),
        })
    }

    /// Every date in the horizon, excluding `today` itself.
    pub fn candidates(&self, today: NaiveDate) -> Vec<DateCandidate> {
        (1..=self.config.horizon_days)
            .filter_map(|offset| self.candidate(today, offset))
            .collect()
    }

    /// Run the rule table against one date.
    pub fn adjust(&self, candidate: &DateCandidate) -> Adjustment {
        let mut adjustment = Adjustment::baseline();
        for rule in &self.rules {
            if rule.kind.applies(candidate) {
                adjustment.apply(rule, candidate);
            }
        }
        adjustment
    }

    /// Price one property on one date. Returns `None` when the property
    /// has no usable base price, no rule fired, or the rounded price does
    /// not move in the direction the rules intended.
    pub fn evaluate(&self, property: &Property, candidate: &DateCandidate) -> Option<PricingSuggestion> {
        let base = property.nightly_rate()?;
        let adjustment = self.adjust(candidate);
        if adjustment.is_baseline() {
            return None;
        }

        let suggested = (base * adjustment.multiplier)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        if suggested == base {
            return None;
        }

        // Whole-unit rounding of a fractional base price can flip a small
        // discount into a rise (10.90 x 0.99 -> 11).
        if Impact::from_delta(suggested - base) != adjustment.impact {
            debug!(
                property_id = %property.id,
                date = %candidate.date,
                base = %base,
                suggested = %suggested,
                "Rounding reversed the adjustment, dropping"
            );
            return None;
        }

        let confidence = confidence::score(&adjustment.factors, self.config.multi_factor_bonus);
        let rule_type = confidence::classify(&adjustment.factors);
        let reasoning = adjustment.reasoning();

        Some(PricingSuggestion {
            property_id: property.id.clone(),
            property_name: property.name.clone(),
            date: candidate.date,
            current_price: base,
            suggested_price: suggested,
            currency: property.currency.clone(),
            factors: adjustment.factors,
            reasoning,
            confidence,
            impact: adjustment.impact,
            rule_type,
            source: SuggestionSource::Heuristic,
        })
    }

    /// Generate ranked suggestions for every property over the horizon.
    ///
    /// Properties without a positive base price are skipped and logged.
    pub fn generate_suggestions(&self, properties: &[Property], today: NaiveDate) -> Vec<PricingSuggestion> {
        let candidates = self.candidates(today);
        let mut suggestions = Vec::new();
        let mut skipped = 0usize;

        for property in properties {
            if property.nightly_rate().is_none() {
                warn!(
                    property_id = %property.id,
                    base_price = ?property.base_price,
                    "Skipping property without a positive base price"
                );
                skipped += 1;
                continue;
            }

            for candidate in &candidates {
                if let Some(s) = self.evaluate(property, candidate) {
                    debug!(
                        property_id = %s.property_id,
                        date = %s.date,
                        current = %s.current_price,
                        suggested = %s.suggested_price,
                        confidence = s.confidence,
                        "Suggestion"
                    );
                    suggestions.push(s);
                }
            }
        }

        let qualifying = suggestions.len();
        let ranked = rank_suggestions(suggestions, self.config.max_suggestions);

        info!(
            properties = properties.len(),
            skipped,
            qualifying,
            returned = ranked.len(),
            %today,
            "Heuristic suggestions generated"
        );

        ranked
    }
}

/// Sort by revenue impact (descending), then date and property id for a
/// stable order, and keep the first `limit`.
pub fn rank_suggestions(mut suggestions: Vec<PricingSuggestion>, limit: usize) -> Vec<PricingSuggestion> {
    suggestions.sort_by(|a, b| {
        b.revenue_impact()
            .cmp(&a.revenue_impact())
            .then_with(|| a.date.cmp(&b.date))
            .then_with(|| a.property_id.cmp(&b.property_id))
    });
    suggestions.truncate(limit);
    suggestions
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
