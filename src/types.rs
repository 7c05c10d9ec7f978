//! Shared types for the STAYRATE service.
//!
//! These types form the data model used across all modules: properties
//! as read from the property source, the per-date candidates the engine
//! evaluates, the suggestions it emits, and the pricing-rule records the
//! applier persists.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Property
// ---------------------------------------------------------------------------

/// A rentable property with a default nightly rate.
///
/// Owned and mutated by the property-management side; the engine only
/// reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
    /// Default nightly rate before any adjustment. `None` when the
    /// listing has no price yet.
    #[serde(default)]
    pub base_price: Option<Decimal>,
    /// ISO 4217 currency code, e.g. "USD".
    pub currency: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, rename = "type")]
    pub property_type: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base_price {
            Some(p) => write!(f, "[{}] {} ({} {}/night)", self.id, self.name, p, self.currency),
            None => write!(f, "[{}] {} (no base price)", self.id, self.name),
        }
    }
}

impl Property {
    /// The base price, but only when it is strictly positive.
    pub fn nightly_rate(&self) -> Option<Decimal> {
        self.base_price.filter(|p| *p > Decimal::ZERO)
    }

    /// Helper to build a test/sample property with sensible defaults.
    #[cfg(test)]
    pub fn sample(id: &str, base_price: Decimal) -> Self {
        Property {
            id: id.to_string(),
            name: format!("Sample {id}"),
            base_price: Some(base_price),
            currency: "USD".to_string(),
            location: Some("Lisbon".to_string()),
            property_type: Some("apartment".to_string()),
            amenities: vec!["wifi".to_string()],
            is_active: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Date candidate
// ---------------------------------------------------------------------------

/// A calendar date inside the suggestion horizon, with the attributes
/// every pricing rule is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCandidate {
    pub date: NaiveDate,
    /// Days after the reference date (1 = tomorrow).
    pub offset: u32,
    pub weekday: Weekday,
    /// Friday or Saturday night.
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub holiday_name: Option<String>,
    pub is_last_minute: bool,
    /// 1-based month of year.
    pub month: u32,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Tag describing why a price moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Baseline,
    Weekend,
    Demand,
    Holiday,
    LastMinute,
    Occupancy,
    Seasonal,
}

impl Factor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Baseline => "baseline",
            Factor::Weekend => "weekend",
            Factor::Demand => "demand",
            Factor::Holiday => "holiday",
            Factor::LastMinute => "last_minute",
            Factor::Occupancy => "occupancy",
            Factor::Seasonal => "seasonal",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a factor tag (case-insensitive, accepts a few common synonyms).
impl std::str::FromStr for Factor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "baseline" => Ok(Factor::Baseline),
            "weekend" => Ok(Factor::Weekend),
            "demand" | "high_demand" => Ok(Factor::Demand),
            "holiday" | "event" => Ok(Factor::Holiday),
            "last_minute" | "lastminute" => Ok(Factor::LastMinute),
            "occupancy" | "low_occupancy" => Ok(Factor::Occupancy),
            "seasonal" | "season" => Ok(Factor::Seasonal),
            _ => Err(anyhow::anyhow!("Unknown pricing factor: {s}")),
        }
    }
}

/// Direction of a suggested price relative to the base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Increase,
    Decrease,
    Maintain,
}

impl Impact {
    /// Classify a price change by its sign.
    pub fn from_delta(delta: Decimal) -> Self {
        if delta > Decimal::ZERO {
            Impact::Increase
        } else if delta < Decimal::ZERO {
            Impact::Decrease
        } else {
            Impact::Maintain
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Impact::Increase => write!(f, "increase"),
            Impact::Decrease => write!(f, "decrease"),
            Impact::Maintain => write!(f, "maintain"),
        }
    }
}

/// Coarse display category for a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Weekend,
    Seasonal,
    Event,
    Demand,
    Occupancy,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Weekend => "weekend",
            RuleType::Seasonal => "seasonal",
            RuleType::Event => "event",
            RuleType::Demand => "demand",
            RuleType::Occupancy => "occupancy",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuleType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekend" => Ok(RuleType::Weekend),
            "seasonal" => Ok(RuleType::Seasonal),
            "event" => Ok(RuleType::Event),
            "demand" => Ok(RuleType::Demand),
            "occupancy" => Ok(RuleType::Occupancy),
            _ => Err(anyhow::anyhow!("Unknown rule type: {s}")),
        }
    }
}

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    /// Deterministic rule table.
    Heuristic,
    /// External generative model, validated against the JSON contract.
    Advisor,
}

impl fmt::Display for SuggestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionSource::Heuristic => write!(f, "heuristic"),
            SuggestionSource::Advisor => write!(f, "advisor"),
        }
    }
}

// ---------------------------------------------------------------------------
// Suggestion
// ---------------------------------------------------------------------------

/// A per-date price adjustment proposed for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSuggestion {
    pub property_id: String,
    pub property_name: String,
    pub date: NaiveDate,
    pub current_price: Decimal,
    pub suggested_price: Decimal,
    pub currency: String,
    pub factors: Vec<Factor>,
    pub reasoning: String,
    /// Heuristic support score, always within 60..=95.
    pub confidence: u8,
    pub impact: Impact,
    pub rule_type: RuleType,
    pub source: SuggestionSource,
}

impl fmt::Display for PricingSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} -> {} {} ({}, {}%, {})",
            self.property_id,
            self.date,
            self.current_price,
            self.suggested_price,
            self.currency,
            self.impact,
            self.confidence,
            self.reasoning,
        )
    }
}

impl PricingSuggestion {
    /// Suggested minus current price.
    pub fn price_delta(&self) -> Decimal {
        self.suggested_price - self.current_price
    }

    /// Estimated revenue impact used for ranking:
    /// `|suggested - current| x confidence / 100`.
    pub fn revenue_impact(&self) -> Decimal {
        self.price_delta().abs() * Decimal::from(self.confidence) / dec!(100)
    }

    pub fn has_factor(&self, factor: Factor) -> bool {
        self.factors.contains(&factor)
    }
}

/// The outcome of one suggestion run, held in memory until the next refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionRun {
    pub generated_at: DateTime<Utc>,
    pub today: NaiveDate,
    pub source: SuggestionSource,
    pub suggestions: Vec<PricingSuggestion>,
}

// ---------------------------------------------------------------------------
// Pricing-rule record
// ---------------------------------------------------------------------------

/// Conditions payload stored alongside an applied suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConditions {
    pub dates: Vec<NaiveDate>,
    pub original_price: Decimal,
    pub confidence: u8,
    pub factors: Vec<Factor>,
}

/// A persisted pricing rule created from an accepted suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRuleRecord {
    pub id: Uuid,
    pub property_id: String,
    pub rule_type: RuleType,
    pub rule_name: String,
    pub conditions: RuleConditions,
    /// Absolute adjustment in the property's currency.
    pub price_adjustment: Decimal,
    pub is_percentage: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for PricingRuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} ({:+})",
            self.property_id, self.rule_type, self.rule_name, self.price_adjustment,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for STAYRATE.
#[derive(Debug, thiserror::Error)]
pub enum StayRateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Advisor error ({model}): {message}")]
    Advisor { model: String, message: String },

    #[error("Invalid suggestion: {0}")]
    InvalidSuggestion(String),

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// The suggestion does not match the latest run held by the server.
    #[error("Stale suggestion: {0}")]
    StaleSuggestion(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
