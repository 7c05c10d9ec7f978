//! STAYRATE: nightly pricing suggestions for hospitality properties
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the property source, rule store and optional advisor, then
//! refreshes suggestions on an interval until Ctrl+C.

use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use stayrate::config::{self, AppConfig};
use stayrate::dashboard::{self, DashboardState};
use stayrate::engine::applier::SuggestionApplier;
use stayrate::engine::pipeline::SuggestionPipeline;
use stayrate::llm::openrouter::OpenRouterClient;
use stayrate::llm::PricingAdvisor;
use stayrate::pricing::PricingEngine;
use stayrate::storage::rules::SqliteRuleStore;
use stayrate::storage::JsonPropertyStore;
use stayrate::types::SuggestionRun;

/// Suggestions echoed to the log after each refresh.
const LOG_TOP_N: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    info!(
        config = %config_path,
        horizon_days = cfg.engine.horizon_days,
        max_suggestions = cfg.engine.max_suggestions,
        refresh_interval_secs = cfg.engine.refresh_interval_secs,
        "STAYRATE starting up"
    );

    // -- Initialise components -------------------------------------------

    let source = Arc::new(JsonPropertyStore::new(&cfg.storage.properties_path));
    let store = Arc::new(SqliteRuleStore::connect(&cfg.storage.database_url).await?);

    let mut pipeline = SuggestionPipeline::new(PricingEngine::new(cfg.pricing_config()));
    if let Some(advisor) = build_advisor(&cfg)? {
        pipeline = pipeline.with_advisor(advisor, Duration::from_secs(cfg.llm.timeout_secs));
    }

    info!(
        properties = %source.path().display(),
        database = %cfg.storage.database_url,
        advisor = pipeline.has_advisor(),
        "Components ready"
    );

    let state = Arc::new(DashboardState::new(source, pipeline, SuggestionApplier::new(store.clone())));

    match state.refresh(Local::now().date_naive()).await {
        Ok(run) => log_run(&run),
        Err(e) => error!(error = %e, "Initial refresh failed"),
    }

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port).await?;
    }

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.engine.refresh_interval_secs.max(1)));
    // The first tick completes immediately; the initial refresh already ran.
    interval.tick().await;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.engine.refresh_interval_secs,
        "Entering refresh loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match state.refresh(Local::now().date_naive()).await {
                    Ok(run) => log_run(&run),
                    Err(e) => error!(error = %e, "Refresh failed, keeping previous suggestions"),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    store.close().await;
    info!("STAYRATE shut down cleanly.");
    Ok(())
}

/// Build the advisor when enabled and a key is available.
fn build_advisor(cfg: &AppConfig) -> Result<Option<Box<dyn PricingAdvisor>>> {
    if !cfg.llm.enabled {
        info!("Advisor disabled, heuristic suggestions only");
        return Ok(None);
    }

    let Some(api_key) = AppConfig::resolve_secret(&cfg.llm.api_key_env) else {
        warn!(env = %cfg.llm.api_key_env, "No advisor API key configured, heuristic suggestions only");
        return Ok(None);
    };

    if cfg.llm.provider != "openrouter" {
        warn!(provider = %cfg.llm.provider, "Unknown advisor provider, defaulting to OpenRouter");
    }
    info!(
        model = %cfg.llm.model,
        fallback = ?cfg.llm.fallback_model,
        "Using OpenRouter advisor"
    );

    let mut client = OpenRouterClient::new(
        api_key,
        Some(cfg.llm.model.clone()),
        cfg.llm.fallback_model.clone(),
        Some(cfg.llm.max_tokens),
    )?;
    if let Some(url) = &cfg.llm.api_url {
        client = client.with_api_url(url.clone());
    }
    Ok(Some(Box::new(client)))
}

/// Log a run summary plus the top few suggestions.
fn log_run(run: &SuggestionRun) {
    info!(
        today = %run.today,
        source = %run.source,
        count = run.suggestions.len(),
        "Suggestions refreshed"
    );
    for s in run.suggestions.iter().take(LOG_TOP_N) {
        info!(
            property = %s.property_name,
            date = %s.date,
            current = %s.current_price,
            suggested = %s.suggested_price,
            confidence = s.confidence,
            reasoning = %s.reasoning,
            "Suggestion"
        );
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stayrate=info"));

    let json_logging = std::env::var("STAYRATE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
