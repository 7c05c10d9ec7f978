//! End-to-end suggestion runs: property file in, ranked run out.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::time::Duration;

use stayrate::config::AppConfig;
use stayrate::engine::pipeline::SuggestionPipeline;
use stayrate::pricing::PricingEngine;
use stayrate::storage::{save_properties, JsonPropertyStore, PropertySource};
use stayrate::types::{Factor, SuggestionSource};

use crate::mock_advisor::{property, ScriptedAdvisor};

/// A Tuesday at the start of July.
fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
}

fn heuristic() -> SuggestionPipeline {
    SuggestionPipeline::new(PricingEngine::default())
}

#[tokio::test]
async fn test_sample_data_produces_valid_run() {
    let source = JsonPropertyStore::new("data/properties.json");
    let properties = source.active_properties().await.unwrap();
    assert!(properties.iter().all(|p| p.is_active));
    assert!(!properties.iter().any(|p| p.id == "retired-flat"));

    let run = heuristic().run(&properties, today()).await;
    assert_eq!(run.source, SuggestionSource::Heuristic);
    assert!(!run.suggestions.is_empty());
    assert!(run.suggestions.len() <= 12);

    for s in &run.suggestions {
        assert_ne!(s.suggested_price, s.current_price);
        assert!((60..=95).contains(&s.confidence));
        assert!(s.date > today());
        assert_ne!(s.property_id, "draft-listing");
    }
    for pair in run.suggestions.windows(2) {
        assert!(pair[0].revenue_impact() >= pair[1].revenue_impact());
    }
}

#[tokio::test]
async fn test_sample_config_drives_engine() {
    let cfg = AppConfig::load("config.toml").unwrap();
    let engine = PricingEngine::new(cfg.pricing_config());
    assert_eq!(engine.config().horizon_days, 14);
    assert!(engine.config().holidays.is_holiday(NaiveDate::from_ymd_opt(2025, 7, 4).unwrap()));
}

#[tokio::test]
async fn test_file_edits_show_up_on_next_run() {
    let mut path = std::env::temp_dir();
    path.push(format!("stayrate_it_{}.json", uuid::Uuid::new_v4()));
    let source = JsonPropertyStore::new(&path);
    let pipeline = heuristic();

    save_properties(&path, &[property("a", dec!(100))]).unwrap();
    let first = pipeline.run(&source.active_properties().await.unwrap(), today()).await;
    assert!(first.suggestions.iter().all(|s| s.property_id == "a"));

    let mut retired = property("a", dec!(100));
    retired.is_active = false;
    save_properties(&path, &[retired, property("b", dec!(250))]).unwrap();
    let second = pipeline.run(&source.active_properties().await.unwrap(), today()).await;
    assert!(!second.suggestions.is_empty());
    assert!(second.suggestions.iter().all(|s| s.property_id == "b"));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_independence_day_weekend_stack() {
    let run = heuristic().run(&[property("p1", dec!(100))], today()).await;
    let july4 = run
        .suggestions
        .iter()
        .find(|s| s.date == NaiveDate::from_ymd_opt(2025, 7, 4).unwrap())
        .expect("Friday 4 July should be suggested");

    // 100 * 1.25 * 1.15 * 1.10 = 158.125
    assert_eq!(july4.suggested_price, dec!(158));
    assert_eq!(july4.confidence, 95);
    assert!(july4.has_factor(Factor::Holiday));
    assert!(july4.has_factor(Factor::Weekend));
    assert!(july4.has_factor(Factor::Seasonal));
    assert!(july4.reasoning.contains("Independence Day"));
    // Highest impact of the fortnight
    assert_eq!(run.suggestions[0].date, july4.date);
}

#[tokio::test]
async fn test_advisor_reply_replaces_heuristic() {
    let advisor = ScriptedAdvisor::new().reply(
        r#"Here you go:
        ```json
        {"suggestions": [
            {"property_id": "p1", "date": "2025-07-05", "suggested_price": 145,
             "reasoning": "Festival weekend", "confidence": 0.85, "factors": ["weekend", "event"]},
            {"property_id": "nope", "date": "2025-07-05", "suggested_price": 145,
             "reasoning": "Unknown listing", "confidence": 80, "factors": ["weekend"]}
        ]}
        ```"#,
    );
    let requests = advisor.requests();
    let pipeline = heuristic().with_advisor(Box::new(advisor), Duration::from_secs(5));

    let props = [property("p1", dec!(100)), {
        let mut p = property("unpriced", dec!(1));
        p.base_price = None;
        p
    }];
    let run = pipeline.run(&props, today()).await;

    assert_eq!(run.source, SuggestionSource::Advisor);
    assert_eq!(run.suggestions.len(), 1);
    let s = &run.suggestions[0];
    assert_eq!(s.suggested_price, dec!(145));
    assert_eq!(s.confidence, 85);
    assert_eq!(s.source, SuggestionSource::Advisor);

    let seen = requests.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].properties.len(), 1);
    assert_eq!(seen[0].horizon.len(), 14);
}

#[tokio::test]
async fn test_advisor_failure_matches_heuristic_output() {
    let props = [property("p1", dec!(100)), property("p2", dec!(80))];
    let expected = PricingEngine::default().generate_suggestions(&props, today());

    for advisor in [
        ScriptedAdvisor::new().fail("HTTP 503: upstream overloaded"),
        ScriptedAdvisor::new().reply("I cannot help with pricing."),
        ScriptedAdvisor::new().reply(r#"{"suggestions": []}"#),
        ScriptedAdvisor::new().reply(
            r#"{"suggestions": [{"property_id": "p1", "date": "2030-01-01",
               "suggested_price": 120, "factors": ["weekend"]}]}"#,
        ),
    ] {
        let pipeline = heuristic().with_advisor(Box::new(advisor), Duration::from_secs(5));
        let run = pipeline.run(&props, today()).await;
        assert_eq!(run.source, SuggestionSource::Heuristic);
        assert_eq!(run.suggestions, expected);
    }
}

#[test]
fn test_empty_portfolio_is_empty_run() {
    let advisor = ScriptedAdvisor::new().fail("should not be called");
    let requests = advisor.requests();
    let pipeline = heuristic().with_advisor(Box::new(advisor), Duration::from_secs(5));

    let run = tokio_test::block_on(pipeline.run(&[], today()));
    assert!(run.suggestions.is_empty());
    assert!(requests.lock().unwrap().is_empty());
}

#[test]
fn test_repeated_runs_are_identical() {
    let props = [property("p1", dec!(100)), property("p2", dec!(333.33)), property("p3", dec!(59))];
    let pipeline = heuristic();

    let a = tokio_test::block_on(pipeline.run(&props, today()));
    let b = tokio_test::block_on(pipeline.run(&props, today()));
    assert_eq!(a.suggestions, b.suggestions);
    assert_eq!(a.today, b.today);
}
