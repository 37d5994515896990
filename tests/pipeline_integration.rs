//! Integration tests for the full enrichment pipeline.

mod common;

use common::fixtures::{ProductBuilder, Storefronts, rated_comment};
use pricelens::catalog::{CommentMap, next_category_id};
use pricelens::embedding::EmbeddingMethod;
use pricelens::pipeline::Pipeline;
use pricelens::search::{QueryVectors, Resolution, SearchEngine};
use pricelens::sentiment::{MockSentimentClassifier, SentimentCache, SentimentClass};

fn seed(fronts: &Storefronts) {
    fronts.write_products(
        "ecommerce1",
        &[
            ProductBuilder::new("ayk_01")
                .price(1000.0)
                .rating(4)
                .clip(vec![1.0, 0.0])
                .text_clip(vec![0.0, 1.0])
                .build(),
            ProductBuilder::new("ayk_02")
                .price(500.0)
                .rating(3)
                .clip(vec![0.0, 1.0])
                .text_clip(vec![1.0, 0.0])
                .build(),
        ],
    );
    fronts.write_products(
        "ecommerce2",
        &[ProductBuilder::new("ayk_01")
            .price(900.0)
            .rating(4)
            .clip(vec![1.0, 0.0])
            .text_clip(vec![0.0, 1.0])
            .build()],
    );

    let mut first = CommentMap::new();
    first.insert(
        "ayk_01",
        vec![rated_comment("Harika ayakkabı", 5), rated_comment("Çok rahat", 4)],
    );
    first.insert("ayk_02", vec![rated_comment("Bozuk geldi", 1)]);
    fronts.write_comments("ecommerce1", &first);

    let mut second = CommentMap::new();
    second.insert("ayk_01", vec![rated_comment("Güzel model", 5)]);
    fronts.write_comments("ecommerce2", &second);
}

#[tokio::test]
async fn test_pipeline_enriches_scores_and_rates_every_store() {
    let fronts = Storefronts::new();
    seed(&fronts);
    let config = fronts.config();

    let pipeline = Pipeline::from_config(
        &config,
        &fronts.catalog,
        fronts.client(MockSentimentClassifier::new()),
    );
    let report = pipeline.run().await.expect("pipeline run");

    assert_eq!(report.changed_products.len(), 2);
    assert_eq!(report.changed_comments.len(), 2);
    assert_eq!(report.summary.failed, 0);

    let cache = SentimentCache::load(config.cache_file()).expect("cache");
    assert_eq!(cache.len(), 4);
    assert!(config.product_state_file().exists());
    assert!(config.comment_state_file().exists());

    let comments = fronts.store("ecommerce1").load_comments().expect("comments");
    let classes: Vec<_> = comments
        .comments()
        .filter_map(|c| c.sentiment_class)
        .collect();
    assert_eq!(
        classes,
        vec![SentimentClass::Positive, SentimentClass::Positive, SentimentClass::Negative]
    );

    let products = fronts.store("ecommerce1").load_products().expect("products");
    let shoe = &products[0];
    assert!(shoe.vector(EmbeddingMethod::Combined).is_some());
    assert!(shoe.score.is_some());
    assert_eq!(shoe.rating_value(), Some(4.5));
    assert_eq!(shoe.rating_count, Some(2));
    let metadata = shoe.score_metadata.as_ref().expect("metadata");
    assert!(metadata.has_sentiment);
    assert_eq!(metadata.comment_count, 2);
}

#[tokio::test]
async fn test_pipeline_output_does_not_retrigger() {
    let fronts = Storefronts::new();
    seed(&fronts);
    let config = fronts.config();

    Pipeline::from_config(&config, &fronts.catalog, fronts.client(MockSentimentClassifier::new()))
        .run()
        .await
        .expect("first run");

    let report = Pipeline::from_config(
        &config,
        &fronts.catalog,
        fronts.client(MockSentimentClassifier::new()),
    )
    .run()
    .await
    .expect("second run");

    assert!(report.is_noop());
    assert!(report.scoring.is_none());
}

#[tokio::test]
async fn test_failed_run_is_retried_on_next_run() {
    let fronts = Storefronts::new();
    seed(&fronts);
    let config = fronts.config();

    let err = Pipeline::from_config(
        &config,
        &fronts.catalog,
        fronts.client(MockSentimentClassifier::new().with_failures(100)),
    )
    .run()
    .await
    .expect_err("classifier is down");
    assert!(err.is_retries_exhausted());

    let report = Pipeline::from_config(
        &config,
        &fronts.catalog,
        fronts.client(MockSentimentClassifier::new()),
    )
    .run()
    .await
    .expect("recovered run");

    assert!(report.changed_products.is_empty());
    assert_eq!(report.changed_comments.len(), 2);
    assert_eq!(report.scoring.as_ref().map(|s| s.files_updated), Some(2));
}

#[tokio::test]
async fn test_search_after_pipeline_prefers_best_scored_offer() {
    let fronts = Storefronts::new();
    seed(&fronts);
    let config = fronts.config();

    Pipeline::from_config(&config, &fronts.catalog, fronts.client(MockSentimentClassifier::new()))
        .run()
        .await
        .expect("pipeline run");

    let query = QueryVectors::new()
        .with(EmbeddingMethod::Visual, vec![1.0, 0.0])
        .with(EmbeddingMethod::Combined, vec![1.0, 0.0]);
    let outcome = SearchEngine::new(fronts.files()).search("ayakkabi", &query, 3);

    assert_eq!(outcome.fused[0].product_id, "ayk_01");
    match &outcome.resolution {
        Resolution::Variants {
            best_offer,
            other_offers,
        } => {
            assert_eq!(best_offer.store, "ecommerce2");
            assert_eq!(other_offers.len(), 1);
            assert_eq!(other_offers[0].store, "ecommerce1");
            assert!(best_offer.score > other_offers[0].score);
        }
        other => panic!("expected variants, got {other:?}"),
    }
}

#[test]
fn test_next_id_across_stores() {
    let fronts = Storefronts::new();
    seed(&fronts);

    let prefix = fronts
        .catalog
        .category("ayakkabi")
        .expect("category")
        .id_prefix();
    assert_eq!(next_category_id(&fronts.files(), &prefix), "ayk_03");
}
