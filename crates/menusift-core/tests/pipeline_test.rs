//! Pipeline behaviour with mock collaborators

use async_trait::async_trait;
use menusift_core::{
    AttributeSchema, Config, ConstraintExtractor, ConstraintSource, Corpus, CorpusHandle, Item,
    MenuAssistant, MenuSiftError, ResponseGenerator, Result, ResultMode, SemanticSearch,
};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FixedSource(Value);

#[async_trait]
impl ConstraintSource for FixedSource {
    async fn extract_raw(&self, _query: &str) -> Result<Map<String, Value>> {
        Ok(self.0.as_object().cloned().unwrap_or_default())
    }
}

/// Echoes the first line of every block it receives
#[derive(Default)]
struct EchoGenerator {
    blocks: Mutex<Vec<String>>,
}

#[async_trait]
impl ResponseGenerator for EchoGenerator {
    async fn generate(&self, _query: &str, blocks: &[String]) -> Result<String> {
        self.blocks.lock().unwrap().extend(blocks.iter().cloned());
        Ok(blocks
            .iter()
            .filter_map(|b| b.lines().next())
            .collect::<Vec<_>>()
            .join("; "))
    }
}

struct FixedRanking(Vec<&'static str>);

#[async_trait]
impl SemanticSearch for FixedRanking {
    async fn search(&self, _query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self.0.iter().take(k).map(|s| s.to_string()).collect())
    }
}

struct BrokenSearch;

#[async_trait]
impl SemanticSearch for BrokenSearch {
    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<String>> {
        Err(MenuSiftError::ExternalCallFailure("index offline".to_string()))
    }
}

fn catalog() -> Vec<Item> {
    vec![
        Item::new("1", "Dal de lentejas")
            .with_description("Lentejas rojas y leche de coco")
            .with_bool("is_vegano", true)
            .with_number("kcal", 420.0)
            .with_number("proteinas", 18.0)
            .with_number("precio", 5.9),
        Item::new("2", "Pollo tikka")
            .with_bool("is_vegano", false)
            .with_number("kcal", 560.0)
            .with_number("proteinas", 38.0)
            .with_number("precio", 6.5),
        Item::new("3", "Buddha bowl")
            .with_bool("is_vegano", true)
            .with_number("kcal", 390.0)
            .with_number("proteinas", 14.0)
            .with_number("precio", 6.2),
        Item::new("4", "Salmón con quinoa")
            .with_bool("is_vegano", false)
            .with_number("kcal", 480.0)
            .with_number("proteinas", 32.0)
            .with_number("precio", 7.9),
        Item::new("5", "Curry de garbanzos")
            .with_bool("is_vegano", true)
            .with_number("kcal", 450.0)
            .with_number("proteinas", 16.0)
            .with_number("precio", 5.5),
    ]
}

fn handle() -> CorpusHandle {
    let (corpus, _) = Corpus::new(catalog(), &AttributeSchema::default_catalog()).unwrap();
    CorpusHandle::new(corpus)
}

fn assistant(config: Config, raw: Value, generator: Arc<dyn ResponseGenerator>) -> MenuAssistant {
    let extractor = ConstraintExtractor::new(
        Arc::new(FixedSource(raw)),
        AttributeSchema::default_catalog(),
        Duration::from_secs(1),
    );
    MenuAssistant::new(config, handle(), extractor, generator).unwrap()
}

#[tokio::test]
async fn answer_receives_every_context_block() {
    let generator = Arc::new(EchoGenerator::default());
    let assistant = assistant(Config::default(), json!({"is_vegano": true}), generator.clone());

    let answer = assistant.answer("algo vegano").await.unwrap();
    assert!(!answer.generation_degraded);
    assert_eq!(answer.recommendation.ids(), vec!["1", "3", "5"]);
    assert_eq!(
        answer.text,
        "Dal de lentejas (id 1); Buddha bowl (id 3); Curry de garbanzos (id 5)"
    );

    let blocks = generator.blocks.lock().unwrap();
    assert_eq!(blocks.len(), 3);
    for block in blocks.iter() {
        for spec in AttributeSchema::default_catalog().iter() {
            assert!(block.contains(&format!("- {}:", spec.display_label())));
        }
    }
}

#[tokio::test]
async fn fallback_when_nothing_matches_exactly() {
    let assistant = assistant(
        Config::default(),
        json!({"is_vegano": true, "proteinas": ">30"}),
        Arc::new(EchoGenerator::default()),
    );

    let rec = assistant.recommend("vegano con mucha proteína").await.unwrap();
    assert_eq!(rec.exact_matches, 0);
    assert!(rec.fallback_triggered);
    assert_eq!(rec.mode, ResultMode::Fallback);
    assert_eq!(rec.items.len(), 5);
    // the closest vegan dish beats the non-vegan protein bombs
    assert_eq!(rec.items[0].id, "1");
    assert!(rec.items.iter().all(|s| s.score.is_some()));
    assert_eq!(rec.presented_items().len(), 5);
}

#[tokio::test]
async fn variety_keyword_raises_fallback_threshold() {
    let mut config = Config::default();
    config.fallback.base_threshold = 2;
    config.fallback.extended_threshold = 4;
    let assistant = assistant(config, json!({"is_vegano": true}), Arc::new(EchoGenerator::default()));

    let plain = assistant.recommend("algo vegano").await.unwrap();
    assert!(!plain.fallback_triggered);

    let variety = assistant.recommend("opciones veganas").await.unwrap();
    assert!(variety.fallback_triggered);
    assert_eq!(variety.mode, ResultMode::Exact);
    assert_eq!(variety.ids(), vec!["1", "3", "5"]);
}

#[tokio::test]
async fn top_up_appends_near_misses_to_short_exact_result() {
    let mut config = Config::default();
    config.fallback.top_up_exact = true;
    config.fallback.top_up_limit = 1;
    let assistant = assistant(
        config,
        json!({"kcal": "<400"}),
        Arc::new(EchoGenerator::default()),
    );

    let rec = assistant.recommend("algo ligero").await.unwrap();
    assert_eq!(rec.mode, ResultMode::Exact);
    assert_eq!(rec.exact_matches, 1);
    assert_eq!(rec.supplemented, 1);
    assert_eq!(rec.items[0].id, "3");
    assert_eq!(rec.items[0].score, None);
    assert_eq!(rec.items[1].id, "1");
    assert!(rec.items[1].score.unwrap() > 0.0);
}

#[tokio::test]
async fn semantic_ranking_orders_exact_matches() {
    let assistant = assistant(Config::default(), json!({"is_vegano": true}), Arc::new(EchoGenerator::default()))
        .with_semantic_search(Arc::new(FixedRanking(vec!["5", "2", "3"])));

    let rec = assistant.recommend("curry vegano").await.unwrap();
    assert_eq!(rec.mode, ResultMode::Exact);
    assert_eq!(rec.ids(), vec!["5", "3", "1"]);
}

#[tokio::test]
async fn semantic_mode_for_unconstrained_queries_when_enabled() {
    let mut config = Config::default();
    config.selection.semantic_when_unconstrained = true;
    let assistant = assistant(config, json!({}), Arc::new(EchoGenerator::default()))
        .with_semantic_search(Arc::new(FixedRanking(vec!["4", "99", "2"])));

    let rec = assistant.recommend("algo rico de pescado").await.unwrap();
    assert_eq!(rec.mode, ResultMode::Semantic);
    assert_eq!(rec.ids(), vec!["4", "2"]);
}

#[tokio::test]
async fn failing_semantic_search_is_ignored() {
    let assistant = assistant(Config::default(), json!({"is_vegano": true}), Arc::new(EchoGenerator::default()))
        .with_semantic_search(Arc::new(BrokenSearch));

    let rec = assistant.recommend("algo vegano").await.unwrap();
    assert_eq!(rec.ids(), vec!["1", "3", "5"]);
}

#[tokio::test]
async fn repeated_queries_are_identical() {
    let assistant = assistant(
        Config::default(),
        json!({"is_vegano": true, "kcal": "<=400", "precio": "<6"}),
        Arc::new(EchoGenerator::default()),
    );

    let first = assistant.recommend("barato y ligero").await.unwrap();
    let second = assistant.recommend("barato y ligero").await.unwrap();
    assert_eq!(first.items, second.items);
    assert_eq!(first.mode, second.mode);
}

#[tokio::test]
async fn reload_swaps_snapshot_for_later_queries() {
    let assistant = assistant(Config::default(), json!({"is_vegano": true}), Arc::new(EchoGenerator::default()));
    let before = assistant.corpus().snapshot();

    let (smaller, _) = Corpus::new(
        vec![Item::new("9", "Gazpacho").with_bool("is_vegano", true)],
        &AttributeSchema::default_catalog(),
    )
    .unwrap();
    assistant.corpus().replace(smaller);

    let rec = assistant.recommend("algo vegano").await.unwrap();
    assert_eq!(rec.ids(), vec!["9"]);
    assert_eq!(before.len(), 5);
}

#[test]
fn invalid_configuration_is_rejected_at_construction() {
    let mut config = Config::default();
    config.selection.presentation_cap = 60;

    let extractor = ConstraintExtractor::new(
        Arc::new(FixedSource(json!({}))),
        AttributeSchema::default_catalog(),
        Duration::from_secs(1),
    );
    let err = MenuAssistant::new(config, handle(), extractor, Arc::new(EchoGenerator::default()))
        .err()
        .unwrap();
    assert!(matches!(err, MenuSiftError::InvalidConfiguration(_)));
}
