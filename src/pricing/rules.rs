//! Pricing rule table and holiday calendar.
//!
//! Every adjustment the engine can make is one row in an ordered table.
//! Rows are evaluated top to bottom against a `DateCandidate`; the ones
//! whose predicate holds multiply the running price and rewrite the
//! reasoning, factor tags, and impact as their modes dictate.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{DateCandidate, Factor, Impact};

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

/// Forward window, in days after the reference date.
pub const DEFAULT_HORIZON_DAYS: u32 = 14;
/// Leading days of the horizon that qualify for the last-minute rule.
pub const DEFAULT_LAST_MINUTE_DAYS: u32 = 3;
/// Cap on the number of suggestions returned per run.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 12;

/// Engine tuning. The optional rules and the holiday table are the
/// points on which older dashboard builds disagreed, so they are data.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub horizon_days: u32,
    pub last_minute_days: u32,
    pub max_suggestions: usize,
    pub holidays: HolidayCalendar,
    /// Apply the December–February discount on non-holiday dates.
    pub winter_rule: bool,
    /// Add +5 confidence when more than two factors contribute.
    pub multi_factor_bonus: bool,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            last_minute_days: DEFAULT_LAST_MINUTE_DAYS,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            holidays: HolidayCalendar::default(),
            winter_rule: true,
            multi_factor_bonus: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Holiday calendar
// ---------------------------------------------------------------------------

/// A fixed-date holiday that recurs every year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    pub month: u32,
    pub day: u32,
    pub name: String,
}

impl Holiday {
    pub fn new(month: u32, day: u32, name: &str) -> Self {
        Self {
            month,
            day,
            name: name.to_string(),
        }
    }

    fn matches(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.day() == self.day
    }
}

/// Month/day holiday table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayCalendar {
    holidays: Vec<Holiday>,
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::new(vec![
            Holiday::new(1, 1, "New Year's Day"),
            Holiday::new(7, 4, "Independence Day"),
            Holiday::new(10, 31, "Halloween"),
            Holiday::new(12, 24, "Christmas Eve"),
            Holiday::new(12, 25, "Christmas Day"),
            Holiday::new(12, 31, "New Year's Eve"),
        ])
    }
}

impl HolidayCalendar {
    pub fn new(holidays: Vec<Holiday>) -> Self {
        Self { holidays }
    }

    /// A calendar with no holidays at all.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn lookup(&self, date: NaiveDate) -> Option<&Holiday> {
        self.holidays.iter().find(|h| h.matches(date))
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.lookup(date).is_some()
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// Which date predicate a rule tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Weekend,
    Holiday,
    LastMinute,
    Summer,
    Winter,
}

impl RuleKind {
    /// Whether this rule fires for the candidate date.
    pub fn applies(&self, c: &DateCandidate) -> bool {
        match self {
            RuleKind::Weekend => c.is_weekend,
            RuleKind::Holiday => c.is_holiday,
            RuleKind::LastMinute => c.is_last_minute && !c.is_weekend && !c.is_holiday,
            RuleKind::Summer => (6..=9).contains(&c.month),
            RuleKind::Winter => matches!(c.month, 12 | 1 | 2) && !c.is_holiday,
        }
    }
}

/// How a rule's reason fragment combines with the running reasoning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonMode {
    /// Discard earlier fragments.
    Replace,
    /// Add after earlier fragments.
    Append,
}

/// How a rule's factor tags combine with the running factor list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorMode {
    Replace,
    Extend,
}

/// How a rule changes the running impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactOverride {
    Set(Impact),
    /// Only takes effect while no earlier rule has set a direction.
    IfMaintain(Impact),
}

/// One row of the rule table.
#[derive(Debug, Clone)]
pub struct PricingRule {
    pub kind: RuleKind,
    pub multiplier: Decimal,
    pub reason: &'static str,
    pub reason_mode: ReasonMode,
    pub factors: &'static [Factor],
    pub factor_mode: FactorMode,
    pub impact: ImpactOverride,
}

impl PricingRule {
    /// Reason text for a specific date (holidays are named).
    pub fn fragment(&self, c: &DateCandidate) -> String {
        match (&self.kind, &c.holiday_name) {
            (RuleKind::Holiday, Some(name)) => format!("{} ({name})", self.reason),
            _ => self.reason.to_string(),
        }
    }
}

/// Build the ordered rule table for a configuration.
pub fn rule_table(config: &PricingConfig) -> Vec<PricingRule> {
    let mut rules = vec![
        PricingRule {
            kind: RuleKind::Weekend,
            multiplier: dec!(1.25),
            reason: "Weekend premium: Friday and Saturday nights book up first",
            reason_mode: ReasonMode::Replace,
            factors: &[Factor::Weekend, Factor::Demand],
            factor_mode: FactorMode::Extend,
            impact: ImpactOverride::Set(Impact::Increase),
        },
        PricingRule {
            kind: RuleKind::Holiday,
            multiplier: dec!(1.15),
            reason: "Holiday demand surge",
            reason_mode: ReasonMode::Append,
            factors: &[Factor::Holiday],
            factor_mode: FactorMode::Extend,
            impact: ImpactOverride::Set(Impact::Increase),
        },
        PricingRule {
            kind: RuleKind::LastMinute,
            multiplier: dec!(0.9),
            reason: "Last-minute discount to fill an open night",
            reason_mode: ReasonMode::Replace,
            factors: &[Factor::LastMinute, Factor::Occupancy],
            factor_mode: FactorMode::Replace,
            impact: ImpactOverride::Set(Impact::Decrease),
        },
        PricingRule {
            kind: RuleKind::Summer,
            multiplier: dec!(1.10),
            reason: "Peak summer season",
            reason_mode: ReasonMode::Append,
            factors: &[Factor::Seasonal],
            factor_mode: FactorMode::Extend,
            impact: ImpactOverride::IfMaintain(Impact::Increase),
        },
    ];

    if config.winter_rule {
        rules.push(PricingRule {
            kind: RuleKind::Winter,
            multiplier: dec!(0.95),
            reason: "Winter low-season discount",
            reason_mode: ReasonMode::Append,
            factors: &[Factor::Seasonal],
            factor_mode: FactorMode::Extend,
            impact: ImpactOverride::IfMaintain(Impact::Decrease),
        });
    }

    rules
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
