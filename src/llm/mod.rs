//! Generative pricing advisor.
//!
//! Defines the `PricingAdvisor` trait, the prompt templates, the strict
//! JSON response contract, and an OpenRouter-backed implementation.
//! Advisor output is best-effort: anything that fails here is handled
//! by the pipeline falling back to the rule-table engine.

pub mod openrouter;
pub mod parse;
pub mod prompt;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};

use crate::types::Property;

/// Everything an advisor is told about one suggestion run.
#[derive(Debug, Clone)]
pub struct AdvisoryRequest {
    pub today: NaiveDate,
    /// Dates the advisor may price, in order.
    pub horizon: Vec<NaiveDate>,
    /// Only properties with a positive base price.
    pub properties: Vec<Property>,
}

impl AdvisoryRequest {
    pub fn new(properties: &[Property], today: NaiveDate, horizon_days: u32) -> Self {
        let horizon = (1..=horizon_days)
            .filter_map(|offset| today.checked_add_days(Days::new(offset as u64)))
            .collect();

        Self {
            today,
            horizon,
            properties: properties
                .iter()
                .filter(|p| p.nightly_rate().is_some())
                .cloned()
                .collect(),
        }
    }

    pub fn property(&self, id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn in_horizon(&self, date: NaiveDate) -> bool {
        self.horizon.contains(&date)
    }
}

/// Abstraction over external suggestion generators.
///
/// Implementors send the request to a model and return its raw text;
/// validation happens in `parse::parse_suggestions`.
#[async_trait]
pub trait PricingAdvisor: Send + Sync {
    async fn advise(&self, request: &AdvisoryRequest) -> Result<String>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}
