//! Applying suggestions: record shape, sink failures, persistence.

use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;
use mockall::predicate::always;
use rust_decimal_macros::dec;
use std::sync::Arc;

use stayrate::engine::applier::SuggestionApplier;
use stayrate::engine::pipeline::SuggestionPipeline;
use stayrate::pricing::PricingEngine;
use stayrate::storage::rules::SqliteRuleStore;
use stayrate::storage::PricingRuleSink;
use stayrate::types::{PricingRuleRecord, PricingSuggestion, RuleType, StayRateError};

use crate::mock_advisor::property;

mock! {
    pub Sink {}

    #[async_trait]
    impl PricingRuleSink for Sink {
        async fn insert_rule(&self, record: &PricingRuleRecord) -> anyhow::Result<()>;
    }
}

/// Top heuristic suggestion for a single 100/night listing.
async fn top_suggestion() -> PricingSuggestion {
    let run = SuggestionPipeline::new(PricingEngine::default())
        .run(&[property("p1", dec!(100))], NaiveDate::from_ymd_opt(2025, 7, 1).unwrap())
        .await;
    run.suggestions[0].clone()
}

#[tokio::test]
async fn test_apply_sends_one_record() {
    let suggestion = top_suggestion().await;
    let expected_delta = suggestion.suggested_price - suggestion.current_price;

    let mut sink = MockSink::new();
    sink.expect_insert_rule()
        .withf(move |r: &PricingRuleRecord| {
            r.property_id == "p1"
                && r.price_adjustment == expected_delta
                && !r.is_percentage
                && r.is_active
                && r.rule_name.starts_with("AI Suggestion: ")
        })
        .times(1)
        .returning(|_| Ok(()));

    let applier = SuggestionApplier::new(Arc::new(sink));
    let record = applier.apply(&suggestion).await.unwrap();
    assert_eq!(record.rule_type, RuleType::Weekend);
    assert_eq!(record.conditions.dates, vec![suggestion.date]);
    assert_eq!(record.conditions.original_price, dec!(100));
}

#[tokio::test]
async fn test_sink_failure_is_storage_error() {
    let mut sink = MockSink::new();
    sink.expect_insert_rule()
        .with(always())
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("connection reset by peer")));

    let applier = SuggestionApplier::new(Arc::new(sink));
    let err = applier.apply(&top_suggestion().await).await.unwrap_err();
    match err.downcast_ref::<StayRateError>() {
        Some(StayRateError::Storage(msg)) => assert!(msg.contains("connection reset")),
        other => panic!("expected storage error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_no_change_never_reaches_sink() {
    let mut sink = MockSink::new();
    sink.expect_insert_rule().times(0);

    let mut suggestion = top_suggestion().await;
    suggestion.suggested_price = suggestion.current_price;

    let applier = SuggestionApplier::new(Arc::new(sink));
    let err = applier.apply(&suggestion).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StayRateError>(),
        Some(StayRateError::InvalidSuggestion(_))
    ));
}

#[tokio::test]
async fn test_applied_rules_persist_in_sqlite() {
    let store = Arc::new(SqliteRuleStore::in_memory().await.unwrap());
    let applier = SuggestionApplier::new(store.clone());

    let run = SuggestionPipeline::new(PricingEngine::default())
        .run(
            &[property("p1", dec!(100)), property("p2", dec!(240))],
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        )
        .await;
    for s in run.suggestions.iter().take(3) {
        applier.apply(s).await.unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 3);
    let stored = store.list_rules(None).await.unwrap();
    for s in run.suggestions.iter().take(3) {
        assert!(stored.iter().any(|r| r.property_id == s.property_id
            && r.conditions.dates == vec![s.date]
            && r.price_adjustment == s.suggested_price - s.current_price));
    }
}
