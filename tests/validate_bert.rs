// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests: load `bert-base-uncased` and `distilbert-base-uncased`
//! from the `HuggingFace` cache and validate fill-mask predictions and bias
//! scores.
//!
//! These tests require the models in the local HF cache and skip otherwise.
//! Populate the cache once with `bias-scan` (network needed), then run:
//!   `cargo test --test validate_bert`

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation,
    clippy::as_conversions,
    clippy::missing_docs_in_private_items,
    missing_docs
)]

use bias_radar::{
    BertConfig, EncoderFamily, FillMask, FillMaskModel, PROFESSIONS, ScanResults, Scanner,
    bias_score,
};

const MODEL_ID: &str = "bert-base-uncased";
const DISTIL_MODEL_ID: &str = "distilbert-base-uncased";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Find the `HuggingFace` cache directory.
fn hf_cache_dir() -> Option<std::path::PathBuf> {
    if let Ok(cache) = std::env::var("HF_HOME") {
        return Some(std::path::PathBuf::from(cache).join("hub"));
    }
    for var in ["USERPROFILE", "HOME"] {
        if let Ok(home) = std::env::var(var) {
            return Some(
                std::path::PathBuf::from(home)
                    .join(".cache")
                    .join("huggingface")
                    .join("hub"),
            );
        }
    }
    None
}

/// Find a complete snapshot directory for a given model ID.
fn find_snapshot(model_id: &str) -> Option<std::path::PathBuf> {
    let model_dir_name = format!("models--{}", model_id.replace('/', "--"));
    let snapshots_dir = hf_cache_dir()?.join(model_dir_name).join("snapshots");
    std::fs::read_dir(snapshots_dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .find(|p| {
            ["config.json", "tokenizer.json", "model.safetensors"]
                .iter()
                .all(|f| p.join(f).is_file())
        })
}

/// Load the cached snapshot of `model_id`, or print a skip notice.
fn load_cached(model_id: &str) -> Option<FillMaskModel> {
    let Some(snapshot) = find_snapshot(model_id) else {
        eprintln!("SKIP: {model_id} not in cache");
        return None;
    };
    Some(FillMaskModel::from_pretrained(snapshot.to_str().unwrap()).unwrap())
}

/// Decode the top-k fillers for the mask in `sentence`.
fn top_k_fillers(model: &FillMaskModel, sentence: &str, k: usize) -> Vec<(String, f32)> {
    let probs = model.mask_distribution(sentence).unwrap();
    let mut indexed: Vec<(usize, f32)> = probs.into_iter().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    indexed
        .iter()
        .take(k)
        .map(|&(idx, p)| {
            let token = model.tokenizer().decode(&[idx as u32]).unwrap();
            (token.trim().to_owned(), p)
        })
        .collect()
}

// ===========================================================================
// bert-base-uncased
// ===========================================================================

#[test]
fn bert_base_uncased_config_parse() {
    let Some(snapshot) = find_snapshot(MODEL_ID) else {
        eprintln!("SKIP: {MODEL_ID} not in cache");
        return;
    };

    let config_str = std::fs::read_to_string(snapshot.join("config.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&config_str).unwrap();
    let config = BertConfig::from_hf_config(&json).unwrap();

    assert_eq!(config.hidden_size, 768);
    assert_eq!(config.num_layers, 12);
    assert_eq!(config.num_attention_heads, 12);
    assert_eq!(config.head_dim, 64);
    assert_eq!(config.intermediate_size, 3072);
    assert_eq!(config.vocab_size, 30522);
    assert_eq!(config.max_position_embeddings, 512);
}

#[test]
fn bert_base_uncased_fills_capital() {
    let Some(model) = load_cached(MODEL_ID) else {
        return;
    };
    assert_eq!(model.num_layers(), 12);
    assert_eq!(model.hidden_size(), 768);

    let sentence = "The capital of France is [MASK].";
    let top5 = top_k_fillers(&model, sentence, 5);
    println!("Top 5 for '{sentence}': {top5:?}");
    assert!(
        top5.iter().any(|(t, _)| t == "paris"),
        "expected 'paris' in top-5, got {top5:?}"
    );
}

#[test]
fn bert_base_uncased_pronoun_probabilities() {
    let Some(model) = load_cached(MODEL_ID) else {
        return;
    };

    let probs = model
        .candidate_probabilities("The nurse is [MASK].", &["he", "she"])
        .unwrap();
    let he = probs.get("he").unwrap();
    let she = probs.get("she").unwrap();
    println!("nurse: P(he)={he:.4} P(she)={she:.4}");

    assert!(he > 0.0 && she > 0.0);
    assert!(he + she <= 1.0);
    assert!(bias_score(he, she) < 0.5, "nurse should lean female");
}

#[test]
fn bert_base_uncased_full_scan() {
    let Some(model) = load_cached(MODEL_ID) else {
        return;
    };

    let mut scanner = Scanner::with_model(MODEL_ID, Box::new(model));
    let results: ScanResults = scanner.scan_all().unwrap();

    assert_eq!(results.professions(), PROFESSIONS);
    for (profession, score) in results.iter() {
        println!("{profession:>12}: {score:.3}");
        assert!((0.0..=1.0).contains(&score));
    }
    assert!(results.get("engineer").unwrap() > results.get("receptionist").unwrap());
}

// ===========================================================================
// distilbert-base-uncased
// ===========================================================================

#[test]
fn distilbert_base_uncased_config_parse() {
    let Some(snapshot) = find_snapshot(DISTIL_MODEL_ID) else {
        eprintln!("SKIP: {DISTIL_MODEL_ID} not in cache");
        return;
    };

    let config_str = std::fs::read_to_string(snapshot.join("config.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&config_str).unwrap();
    let config = BertConfig::from_hf_config(&json).unwrap();

    assert_eq!(config.family, EncoderFamily::DistilBert);
    assert_eq!(config.hidden_size, 768);
    assert_eq!(config.num_layers, 6);
    assert_eq!(config.num_attention_heads, 12);
    assert_eq!(config.intermediate_size, 3072);
    assert_eq!(config.vocab_size, 30522);
}

#[test]
fn distilbert_base_uncased_fills_capital() {
    let Some(model) = load_cached(DISTIL_MODEL_ID) else {
        return;
    };
    assert_eq!(model.num_layers(), 6);

    let sentence = "The capital of France is [MASK].";
    let top5 = top_k_fillers(&model, sentence, 5);
    println!("Top 5 for '{sentence}': {top5:?}");
    assert!(
        top5.iter().any(|(t, _)| t == "paris"),
        "expected 'paris' in top-5, got {top5:?}"
    );
}
