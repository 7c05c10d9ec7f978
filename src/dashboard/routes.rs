//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::engine::applier::SuggestionApplier;
use crate::engine::pipeline::SuggestionPipeline;
use crate::storage::PropertySource;
use crate::types::{PricingRuleRecord, PricingSuggestion, Property, StayRateError, SuggestionRun};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Properties and the run computed from them. Always replaced together.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub properties: Vec<Property>,
    pub latest: Option<SuggestionRun>,
}

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    source: Arc<dyn PropertySource>,
    pipeline: SuggestionPipeline,
    applier: SuggestionApplier,
    snapshot: RwLock<Snapshot>,
    /// Held for a whole refresh so runs are published in the order they ran.
    refresh_lock: Mutex<()>,
}

impl DashboardState {
    pub fn new(source: Arc<dyn PropertySource>, pipeline: SuggestionPipeline, applier: SuggestionApplier) -> Self {
        Self {
            source,
            pipeline,
            applier,
            snapshot: RwLock::new(Snapshot::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    /// Re-read properties and replace the latest run. If the property
    /// source fails, the previous snapshot is kept and the error returned.
    pub async fn refresh(&self, today: NaiveDate) -> anyhow::Result<SuggestionRun> {
        let _guard = self.refresh_lock.lock().await;

        let properties = self.source.active_properties().await?;
        let run = self.pipeline.run(&properties, today).await;

        *self.snapshot.write().await = Snapshot {
            properties,
            latest: Some(run.clone()),
        };
        Ok(run)
    }

    /// Apply a suggestion from the latest run.
    ///
    /// The posted body only identifies the suggestion by property and
    /// date; the record is built from the server-held copy, and a body
    /// whose prices or confidence differ from it is rejected.
    pub async fn apply(&self, posted: &PricingSuggestion) -> anyhow::Result<PricingRuleRecord> {
        if posted.price_delta().is_zero() {
            return Err(StayRateError::InvalidSuggestion(format!(
                "suggestion for {} on {} does not change the price",
                posted.property_id, posted.date
            ))
            .into());
        }

        let held = {
            let snapshot = self.snapshot.read().await;
            if !snapshot.properties.iter().any(|p| p.id == posted.property_id) {
                return Err(StayRateError::PropertyNotFound(posted.property_id.clone()).into());
            }
            snapshot
                .latest
                .as_ref()
                .and_then(|run| {
                    run.suggestions
                        .iter()
                        .find(|s| s.property_id == posted.property_id && s.date == posted.date)
                })
                .cloned()
        };

        let held = held.ok_or_else(|| {
            StayRateError::StaleSuggestion(format!(
                "no suggestion for {} on {} in the latest run",
                posted.property_id, posted.date
            ))
        })?;

        if held.current_price != posted.current_price
            || held.suggested_price != posted.suggested_price
            || held.confidence != posted.confidence
        {
            return Err(StayRateError::StaleSuggestion(format!(
                "suggestion for {} on {} differs from the latest run",
                posted.property_id, posted.date
            ))
            .into());
        }

        self.applier.apply(&held).await
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub retryable: bool,
}

/// JSON error response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, retryable: bool) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                retryable,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<StayRateError>() {
            Some(StayRateError::Storage(msg)) => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, msg.clone(), true),
            Some(StayRateError::InvalidSuggestion(msg)) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, msg.clone(), false)
            }
            Some(StayRateError::PropertyNotFound(id)) => {
                ApiError::new(StatusCode::NOT_FOUND, format!("property not found: {id}"), false)
            }
            Some(StayRateError::StaleSuggestion(msg)) => ApiError::new(StatusCode::CONFLICT, msg.clone(), false),
            _ => ApiError::new(StatusCode::BAD_GATEWAY, format!("{e:#}"), true),
        }
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RefreshParams {
    /// Reference date; defaults to the local calendar date.
    pub today: Option<NaiveDate>,
}

/// GET /api/properties
pub async fn get_properties(State(state): State<AppState>) -> Json<Vec<Property>> {
    Json(state.snapshot.read().await.properties.clone())
}

/// GET /api/suggestions
pub async fn get_suggestions(State(state): State<AppState>) -> Result<Json<SuggestionRun>, ApiError> {
    match state.snapshot.read().await.latest.as_ref() {
        Some(run) => Ok(Json(run.clone())),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "no suggestion run yet", true)),
    }
}

/// POST /api/suggestions/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Query(params): Query<RefreshParams>,
) -> Result<Json<SuggestionRun>, ApiError> {
    let today = params.today.unwrap_or_else(|| Local::now().date_naive());
    match state.refresh(today).await {
        Ok(run) => Ok(Json(run)),
        Err(e) => {
            warn!(error = %e, "Refresh failed, keeping previous suggestions");
            Err(e.into())
        }
    }
}

/// POST /api/suggestions/apply
pub async fn apply(
    State(state): State<AppState>,
    Json(suggestion): Json<PricingSuggestion>,
) -> Result<(StatusCode, Json<PricingRuleRecord>), ApiError> {
    match state.apply(&suggestion).await {
        Ok(record) => Ok((StatusCode::CREATED, Json(record))),
        Err(e) => {
            warn!(
                property_id = %suggestion.property_id,
                date = %suggestion.date,
                error = %e,
                "Apply rejected"
            );
            Err(e.into())
        }
    }
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

impl From<StayRateError> for ApiError {
    fn from(e: StayRateError) -> Self {
        ApiError::from(anyhow::Error::from(e))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
