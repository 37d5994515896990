use super::*;
use crate::catalog::{CategoryFiles, Product, save_products};
use tempfile::TempDir;

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

#[test]
fn test_l2_normalize_unit_length() {
    let v = l2_normalize(vec![3.0, 4.0]).expect("normalize");
    assert!((v[0] - 0.6).abs() < 1e-6);
    assert!((v[1] - 0.8).abs() < 1e-6);
    assert!((norm(&v) - 1.0).abs() < 1e-6);
}

#[test]
fn test_l2_normalize_rejects_zero_norm() {
    assert!(matches!(l2_normalize(vec![0.0, 0.0, 0.0]), Err(EmbeddingError::ZeroNorm)));
    assert!(matches!(l2_normalize(vec![]), Err(EmbeddingError::ZeroNorm)));
}

#[test]
fn test_combine_vectors_weighted_and_normalized() {
    let combined = combine_vectors(&[1.0, 0.0], &[0.0, 1.0], 0.6, 0.4).expect("combine");
    assert!((norm(&combined) - 1.0).abs() < 1e-6);
    assert!(combined[0] > combined[1]);
    assert!((combined[0] / combined[1] - 1.5).abs() < 1e-5);
}

#[test]
fn test_combine_vectors_truncates_mismatched_lengths() {
    let combined = combine_vectors(&[1.0, 0.0, 5.0], &[1.0, 0.0], 0.5, 0.5).expect("combine");
    assert_eq!(combined.len(), 2);
}

#[test]
fn test_combine_vectors_rejects_opposites_and_empty() {
    assert!(matches!(
        combine_vectors(&[1.0, 0.0], &[-1.0, 0.0], 0.5, 0.5),
        Err(EmbeddingError::ZeroNorm)
    ));
    assert!(combine_vectors(&[], &[1.0], 0.6, 0.4).is_err());
    assert!(combine_vectors(&[1.0], &[1.0], 0.0, 0.0).is_err());
}

#[test]
fn test_method_field_names() {
    assert_eq!(EmbeddingMethod::TextSemantic.field_name(), "text_vector_st");
    assert_eq!(EmbeddingMethod::TextVisual.field_name(), "text_vector_clip");
    assert_eq!(EmbeddingMethod::Visual.field_name(), "clip_vector");
    assert_eq!(EmbeddingMethod::Combined.field_name(), "combined_vector");
}

#[test]
fn test_mock_embedder_is_deterministic_and_normalized() {
    let embedder = MockEmbedder::new(16);
    let a = embedder
        .embed_text(EmbeddingMethod::TextSemantic, "siyah koşu ayakkabısı")
        .expect("embed");
    let b = embedder
        .embed_text(EmbeddingMethod::TextSemantic, "siyah koşu ayakkabısı")
        .expect("embed");
    let other = embedder
        .embed_text(EmbeddingMethod::TextVisual, "siyah koşu ayakkabısı")
        .expect("embed");

    assert_eq!(a, b);
    assert_ne!(a, other);
    assert_eq!(a.len(), 16);
    assert!((norm(&a) - 1.0).abs() < 1e-5);
}

#[test]
fn test_mock_embedder_rejects_bad_inputs() {
    let embedder = MockEmbedder::default();
    assert!(embedder.embed_text(EmbeddingMethod::TextSemantic, "  ").is_err());

    let err = embedder
        .embed_image(Path::new("/definitely/not/here.jpg"))
        .expect_err("missing image");
    assert!(matches!(err, EmbeddingError::ImageNotFound { .. }));
}

#[test]
fn test_combine_category_fills_only_missing() {
    let mut products = vec![
        Product {
            id: Some("a".into()),
            clip_vector: Some(vec![1.0, 0.0]),
            text_vector_clip: Some(vec![0.0, 1.0]),
            ..Product::default()
        },
        Product {
            id: Some("b".into()),
            clip_vector: Some(vec![1.0, 0.0]),
            text_vector_clip: Some(vec![0.0, 1.0]),
            combined_vector: Some(vec![0.0, 1.0]),
            ..Product::default()
        },
        Product {
            id: Some("c".into()),
            clip_vector: Some(vec![1.0, 0.0]),
            ..Product::default()
        },
        Product {
            id: Some("d".into()),
            clip_vector: Some(vec![1.0, 0.0]),
            text_vector_clip: Some(vec![-1.0, 0.0]),
            ..Product::default()
        },
    ];

    let report = combine_category_vectors(&mut products, CombineWeights::default());
    assert_eq!(report.combined, 1);
    assert_eq!(report.up_to_date, 1);
    assert_eq!(report.incomplete, 1);
    assert_eq!(report.failed, 1);
    assert!(products[0].combined_vector.is_some());
    assert_eq!(products[1].combined_vector, Some(vec![0.0, 1.0]));
    assert!(products[3].combined_vector.is_none());
}

#[test]
fn test_combine_falls_back_to_legacy_text_vector() {
    let legacy: Product = serde_json::from_value(serde_json::json!({
        "id": "ayk_01",
        "clip_vector": [1.0, 0.0],
        "clip_text_vector": [0.0, 1.0]
    }))
    .expect("parse");
    let current = Product {
        id: Some("ayk_02".into()),
        clip_vector: Some(vec![1.0, 0.0]),
        text_vector_clip: Some(vec![0.0, 1.0]),
        ..Product::default()
    };
    let unusable: Product = serde_json::from_value(serde_json::json!({
        "id": "ayk_03",
        "clip_vector": [1.0, 0.0],
        "clip_text_vector": "n/a"
    }))
    .expect("parse");
    let mut products = vec![legacy, current, unusable];

    let report = combine_category_vectors(&mut products, CombineWeights::default());
    assert_eq!(report.combined, 2);
    assert_eq!(report.incomplete, 1);
    assert_eq!(products[0].combined_vector, products[1].combined_vector);
    assert!(products[0].extra.contains_key("clip_text_vector"));
    assert!(products[2].combined_vector.is_none());
}

#[test]
fn test_combine_stage_rewrites_only_updated_files() {
    let dir = TempDir::new().expect("temp dir");
    let files = CategoryFiles {
        shop: "ecommerce1".into(),
        category: "ayakkabi".into(),
        products: dir.path().join("product.json"),
        comments: dir.path().join("comments.json"),
    };
    let products = vec![Product {
        id: Some("ayk_01".into()),
        clip_vector: Some(vec![0.6, 0.8]),
        text_vector_clip: Some(vec![0.8, 0.6]),
        ..Product::default()
    }];
    save_products(&files.products, &products.into()).expect("save");

    let first = run_combine_stage(std::slice::from_ref(&files), CombineWeights::default());
    assert_eq!(first.combined, 1);
    assert_eq!(first.written, vec![files.products.clone()]);

    let stored = files.load_products().expect("reload");
    let combined = stored[0].combined_vector.as_ref().expect("combined");
    assert!((norm(combined) - 1.0).abs() < 1e-5);

    let second = run_combine_stage(std::slice::from_ref(&files), CombineWeights::default());
    assert_eq!(second.combined, 0);
    assert_eq!(second.up_to_date, 1);
    assert!(second.written.is_empty());
}

#[test]
fn test_combine_stage_skips_missing_files() {
    let dir = TempDir::new().expect("temp dir");
    let files = CategoryFiles {
        shop: "ecommerce1".into(),
        category: "ayakkabi".into(),
        products: dir.path().join("missing.json"),
        comments: dir.path().join("comments.json"),
    };

    let report = run_combine_stage(&[files], CombineWeights::default());
    assert_eq!(report, CombineReport::default());
}
