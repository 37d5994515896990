use super::*;
use crate::catalog::{Numeric, save_comments};
use crate::sentiment::{SentimentClass, SentimentTuple};
use tempfile::TempDir;

fn product(id: &str, price: f64, rating: f64) -> Product {
    Product {
        id: Some(id.to_string()),
        price: Numeric::from_f64(price),
        rating: Numeric::from_f64(rating),
        ..Product::default()
    }
}

fn annotated(text: &str, polarity: f64, intensity: f64, density: f64) -> Comment {
    let mut comment = Comment::with_text(text);
    comment.set_sentiment(Some(SentimentTuple::new(
        polarity,
        intensity,
        density,
        SentimentClass::Positive,
    )));
    comment
}

#[test]
fn test_value_score() {
    assert_eq!(value_score(Some(5.0), Some(100.0)), 50.0);
    assert_eq!(value_score(Some(0.0), Some(100.0)), 0.0);
    assert_eq!(value_score(Some(4.0), Some(0.0)), 0.0);
    assert_eq!(value_score(None, Some(100.0)), 0.0);
}

#[test]
fn test_min_max_normalization() {
    assert_eq!(normalize_min_max(&[10.0, 20.0, 30.0]), vec![0.0, 0.5, 1.0]);
    assert_eq!(normalize_min_max(&[7.0, 7.0, 7.0]), vec![0.5, 0.5, 0.5]);
    assert_eq!(normalize_min_max(&[3.0]), vec![0.5]);
    assert!(normalize_min_max(&[]).is_empty());
}

#[test]
fn test_normalized_rating() {
    assert_eq!(normalized_rating(Some(5.0)), 1.0);
    assert_eq!(normalized_rating(Some(4.0)), 0.8);
    assert_eq!(normalized_rating(Some(-1.0)), 0.0);
    assert_eq!(normalized_rating(None), 0.0);
}

#[test]
fn test_confidence_floor() {
    assert_eq!(confidence(0, 10), 0.2);
    assert_eq!(confidence(1, 10), 0.2);
    assert_eq!(confidence(5, 10), 0.5);
    assert_eq!(confidence(10, 10), 1.0);
    assert_eq!(confidence(0, 0), 0.2);
}

#[test]
fn test_sentiment_score_ignores_incomplete_comments() {
    let comments = vec![
        annotated("a", 1.0, 1.0, 1.0),
        annotated("b", -1.0, 0.0, 0.0),
        Comment::with_text("not annotated"),
    ];
    let score = sentiment_score(&comments).expect("has sentiment");
    assert!((score - (1.0 + (-1.0 / 3.0)) / 2.0).abs() < 1e-12);

    assert!(sentiment_score(&[Comment::with_text("x")]).is_none());
}

#[test]
fn test_combine_weights() {
    assert!((combine(None, 1.0, 0.5) - 0.75).abs() < 1e-12);
    assert!((combine(Some(0.5), 1.0, 0.5) - (0.2 + 0.3 + 0.15)).abs() < 1e-12);
}

#[test]
fn test_round_to() {
    assert_eq!(round_to(0.123456, 4), 0.1235);
    assert_eq!(round_to(0.75, 3), 0.75);
}

#[test]
fn test_round_to_breaks_ties_to_even() {
    assert_eq!(round_to(0.125, 2), 0.12);
    assert_eq!(round_to(0.375, 2), 0.38);
    assert_eq!(round_to(2.5, 0), 2.0);
    assert_eq!(round_to(-0.0625, 3), -0.062);
}

#[test]
fn test_identical_products_without_sentiment() {
    let mut products = vec![product("a", 100.0, 5.0), product("b", 100.0, 5.0)];
    let mut comments = CommentMap::new();
    comments.insert("a", vec![Comment::with_text("tamam")]);
    comments.insert("b", vec![Comment::with_text("idare eder")]);

    let report = score_category(&mut products, &comments);
    assert_eq!(report.scored, 2);
    assert_eq!(report.without_sentiment, 2);

    for p in &products {
        let meta = p.score_metadata.as_ref().expect("metadata");
        assert_eq!(meta.value_score_norm, 0.5);
        assert_eq!(meta.normalized_rating, 1.0);
        assert_eq!(meta.confidence, 1.0);
        assert!(!meta.has_sentiment);
        assert_eq!(p.score, Some(0.75));
    }
}

#[test]
fn test_confidence_scales_score() {
    let mut products = vec![product("a", 100.0, 5.0), product("b", 100.0, 5.0)];
    let mut comments = CommentMap::new();
    comments.insert("a", (0..10).map(|i| Comment::with_text(format!("yorum {i}"))).collect());
    comments.insert("b", vec![Comment::with_text("tek yorum")]);

    score_category(&mut products, &comments);

    assert_eq!(products[0].score, Some(0.75));
    assert_eq!(products[1].score, Some(0.15));
    assert_eq!(
        products[1].score_metadata.as_ref().map(|m| m.confidence),
        Some(0.2)
    );
}

#[test]
fn test_sentiment_weighting() {
    let mut products = vec![product("a", 100.0, 4.0), product("b", 200.0, 4.0)];
    let mut comments = CommentMap::new();
    comments.insert("a", vec![annotated("harika", 0.6, 0.6, 0.6)]);
    comments.insert("b", vec![Comment::with_text("fena değil")]);

    score_category(&mut products, &comments);

    // a: value 1.0, rating 0.8, sentiment 0.6 -> 0.24 + 0.24 + 0.30
    assert_eq!(products[0].score, Some(0.78));
    assert!(products[0].score_metadata.as_ref().is_some_and(|m| m.has_sentiment));
    // b: value 0.0, rating 0.8, no sentiment -> 0.40
    assert_eq!(products[1].score, Some(0.4));
}

#[test]
fn test_products_without_comments_keep_previous_score() {
    let mut products = vec![product("a", 100.0, 5.0), product("b", 50.0, 3.0)];
    products[1].score = Some(0.42);
    let mut comments = CommentMap::new();
    comments.insert("a", vec![Comment::with_text("iyi")]);
    comments.insert("b", vec![Comment::default()]);

    let report = score_category(&mut products, &comments);
    assert_eq!(report.scored, 1);
    assert_eq!(report.skipped_no_comments, 1);
    assert_eq!(products[1].score, Some(0.42));
    assert!(products[1].score_metadata.is_none());
}

#[test]
fn test_blank_records_count_toward_batch_max_only() {
    let mut products = vec![product("a", 100.0, 5.0), product("b", 100.0, 5.0)];
    let mut comments = CommentMap::new();
    comments.insert("a", vec![Comment::with_text("iyi")]);
    comments.insert(
        "b",
        vec![Comment::with_text("güzel"), Comment::default(), Comment::default(), Comment::default()],
    );

    score_category(&mut products, &comments);

    let meta_a = products[0].score_metadata.as_ref().expect("a");
    let meta_b = products[1].score_metadata.as_ref().expect("b");
    assert_eq!(meta_a.confidence, 0.25);
    assert_eq!(meta_b.comment_count, 1);
    assert_eq!(meta_b.confidence, 0.25);
}

#[test]
fn test_products_without_id_are_skipped() {
    let mut products = vec![
        Product {
            name: Some("isimsiz".to_string()),
            ..Product::default()
        },
        product("a", 100.0, 5.0),
    ];
    let mut comments = CommentMap::new();
    comments.insert("a", vec![Comment::with_text("iyi")]);

    let report = score_category(&mut products, &comments);
    assert_eq!(report.skipped_no_id, 1);
    assert_eq!(report.scored, 1);
    assert!(products[0].score.is_none());
}

#[test]
fn test_scoring_twice_is_bit_identical() {
    let mut products = vec![
        product("a", 1299.9, 4.3),
        product("b", 899.5, 3.7),
        product("c", 2450.0, 4.9),
    ];
    let mut comments = CommentMap::new();
    comments.insert("a", vec![annotated("x", 0.31, 0.77, 0.13), Comment::with_text("y")]);
    comments.insert("b", vec![annotated("z", -0.2, 0.4, 0.9)]);
    comments.insert("c", vec![Comment::with_text("w"); 3]);

    score_category(&mut products, &comments);
    let first: Vec<u64> = products.iter().map(|p| p.score.unwrap_or(0.0).to_bits()).collect();

    score_category(&mut products, &comments);
    let second: Vec<u64> = products.iter().map(|p| p.score.unwrap_or(0.0).to_bits()).collect();

    assert_eq!(first, second);
}

#[test]
fn test_scoring_stage_writes_and_skips() {
    let dir = TempDir::new().expect("temp dir");
    let scored = CategoryFiles {
        shop: "ecommerce1".into(),
        category: "ayakkabi".into(),
        products: dir.path().join("s1").join("product.json"),
        comments: dir.path().join("s1").join("comments.json"),
    };
    let no_comments = CategoryFiles {
        shop: "ecommerce2".into(),
        category: "ayakkabi".into(),
        products: dir.path().join("s2").join("product.json"),
        comments: dir.path().join("s2").join("comments.json"),
    };

    save_products(&scored.products, &vec![product("a", 100.0, 5.0)].into()).expect("save");
    let mut comments = CommentMap::new();
    comments.insert("a", vec![Comment::with_text("iyi")]);
    save_comments(&scored.comments, &comments).expect("save");
    save_products(&no_comments.products, &vec![product("a", 100.0, 5.0)].into()).expect("save");

    let report = run_scoring_stage(&[scored.clone(), no_comments]);
    assert_eq!(report.files_updated, 1);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.written, vec![scored.products.clone()]);

    let reloaded = scored.load_products().expect("reload");
    assert_eq!(reloaded[0].score, Some(0.75));
}

#[test]
fn test_scoring_stage_output_is_stable_across_runs() {
    let dir = TempDir::new().expect("temp dir");
    let files = CategoryFiles {
        shop: "ecommerce1".into(),
        category: "ayakkabi".into(),
        products: dir.path().join("product.json"),
        comments: dir.path().join("comments.json"),
    };
    save_products(&files.products, &vec![product("a", 349.99, 4.2), product("b", 129.0, 3.1)].into())
        .expect("save");
    let mut comments = CommentMap::new();
    comments.insert("a", vec![annotated("x", 0.5, 0.5, 0.25)]);
    comments.insert("b", vec![Comment::with_text("y")]);
    save_comments(&files.comments, &comments).expect("save");

    run_scoring_stage(std::slice::from_ref(&files));
    let first = std::fs::read(&files.products).expect("read");
    run_scoring_stage(std::slice::from_ref(&files));
    let second = std::fs::read(&files.products).expect("read");

    assert_eq!(first, second);
}

#[test]
fn test_scoring_stage_tolerates_malformed_records() {
    let dir = TempDir::new().expect("temp dir");
    let files = CategoryFiles {
        shop: "ecommerce1".into(),
        category: "ayakkabi".into(),
        products: dir.path().join("product.json"),
        comments: dir.path().join("comments.json"),
    };
    std::fs::write(
        &files.products,
        r#"[
            {"id": "ayk_01", "name": "Koşu", "price": 100, "rating": 5, "combined_vector": [1, 0]},
            {"id": 7, "name": "legacy numeric id", "price": 50}
        ]"#,
    )
    .expect("write products");
    std::fs::write(
        &files.comments,
        r#"{
            "ayk_01": [{"text": "rahat", "polarity": 0.5, "intensity": 0.5, "density": 0.25, "sentiment_class": "positive"}],
            "ayk_02": null
        }"#,
    )
    .expect("write comments");

    let report = run_scoring_stage(std::slice::from_ref(&files));
    assert_eq!(report.files_skipped, 0);
    assert_eq!(report.products.scored, 1);
    assert_eq!(report.files_updated, 1);

    let stored: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&files.products).expect("read")).expect("json");
    assert!(stored[0]["pricelens_score"].is_number());
    assert_eq!(
        stored[1],
        serde_json::json!({"id": 7, "name": "legacy numeric id", "price": 50})
    );

    let comments = files.load_comments().expect("comments");
    assert_eq!(comments.unparsed_len(), 1);
}

#[test]
fn test_scoring_stage_keeps_vector_precision() {
    let dir = TempDir::new().expect("temp dir");
    let files = CategoryFiles {
        shop: "ecommerce1".into(),
        category: "ayakkabi".into(),
        products: dir.path().join("product.json"),
        comments: dir.path().join("comments.json"),
    };
    std::fs::write(
        &files.products,
        r#"[{"id": "a", "price": 100, "rating": 4, "combined_vector": [0.12345678901234568, 0.9923456789012345]}]"#,
    )
    .expect("write products");
    let mut comments = CommentMap::new();
    comments.insert("a", vec![Comment::with_text("iyi")]);
    save_comments(&files.comments, &comments).expect("save");

    let report = run_scoring_stage(std::slice::from_ref(&files));
    assert_eq!(report.files_updated, 1);

    let stored: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&files.products).expect("read")).expect("json");
    assert_eq!(
        stored[0]["combined_vector"],
        serde_json::json!([0.12345678901234568, 0.9923456789012345])
    );
}
