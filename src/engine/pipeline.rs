//! Two-stage suggestion pipeline.
//!
//! Stage one asks the configured advisor, bounded by a timeout, and
//! validates its reply. Stage two is the rule-table engine, which runs
//! whenever stage one is missing or fails for any reason. `run` never
//! returns an error.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::llm::{parse, AdvisoryRequest, PricingAdvisor};
use crate::pricing::{rank_suggestions, PricingEngine};
use crate::types::{PricingSuggestion, Property, SuggestionRun, SuggestionSource};

/// Default advisor budget.
pub const DEFAULT_ADVISOR_TIMEOUT: Duration = Duration::from_secs(20);

pub struct SuggestionPipeline {
    engine: PricingEngine,
    advisor: Option<Box<dyn PricingAdvisor>>,
    advisor_timeout: Duration,
}

impl SuggestionPipeline {
    /// Heuristic-only pipeline.
    pub fn new(engine: PricingEngine) -> Self {
        Self {
            engine,
            advisor: None,
            advisor_timeout: DEFAULT_ADVISOR_TIMEOUT,
        }
    }

    /// Try `advisor` first, giving it at most `timeout`.
    pub fn with_advisor(mut self, advisor: Box<dyn PricingAdvisor>, timeout: Duration) -> Self {
        self.advisor = Some(advisor);
        self.advisor_timeout = timeout;
        self
    }

    pub fn has_advisor(&self) -> bool {
        self.advisor.is_some()
    }

    /// Produce a ranked suggestion run for `properties` as of `today`.
    pub async fn run(&self, properties: &[Property], today: NaiveDate) -> SuggestionRun {
        if properties.is_empty() {
            info!(%today, "No properties, nothing to suggest");
            return Self::finish(today, SuggestionSource::Heuristic, Vec::new());
        }

        if let Some(advisor) = &self.advisor {
            match self.try_advisor(advisor.as_ref(), properties, today).await {
                Ok(suggestions) => {
                    let limit = self.engine.config().max_suggestions;
                    return Self::finish(today, SuggestionSource::Advisor, rank_suggestions(suggestions, limit));
                }
                Err(e) => {
                    warn!(
                        model = advisor.model_name(),
                        error = %e,
                        "Advisor unavailable, using heuristic fallback"
                    );
                }
            }
        }

        let suggestions = self.engine.generate_suggestions(properties, today);
        Self::finish(today, SuggestionSource::Heuristic, suggestions)
    }

    async fn try_advisor(
        &self,
        advisor: &dyn PricingAdvisor,
        properties: &[Property],
        today: NaiveDate,
    ) -> anyhow::Result<Vec<PricingSuggestion>> {
        let request = AdvisoryRequest::new(properties, today, self.engine.config().horizon_days);
        if request.properties.is_empty() {
            anyhow::bail!("no priced properties to send");
        }

        let text = tokio::time::timeout(self.advisor_timeout, advisor.advise(&request))
            .await
            .map_err(|_| anyhow::anyhow!("advisor timed out after {:?}", self.advisor_timeout))??;

        parse::parse_suggestions(&text, &request)
    }

    fn finish(today: NaiveDate, source: SuggestionSource, suggestions: Vec<PricingSuggestion>) -> SuggestionRun {
        info!(%today, %source, count = suggestions.len(), "Suggestion run complete");
        SuggestionRun {
            generated_at: Utc::now(),
            today,
            source,
            suggestions,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
