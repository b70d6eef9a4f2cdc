// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model file resolution: local directory or `HuggingFace` Hub.
//!
//! [`resolve_model_files()`] turns a model identifier into the three things
//! a fill-mask session needs: `config.json`, `tokenizer.json`, and the
//! safetensors weights (single file or shards). Hub downloads go through
//! the `hf-hub` sync API and land in the standard `HuggingFace` cache
//! (`~/.cache/huggingface/hub/`, or `$HF_HOME/hub`), so repeat runs work
//! offline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{BiasError, Result};

/// Single-file safetensors checkpoint name.
const SAFETENSORS_FILE: &str = "model.safetensors";
/// Index file of a sharded safetensors checkpoint.
const SAFETENSORS_INDEX_FILE: &str = "model.safetensors.index.json";
/// Longest repo id the Hub accepts.
const MAX_REPO_ID_LEN: usize = 96;

/// Paths of the files needed to load a fill-mask model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    /// `config.json`.
    pub config: PathBuf,
    /// `tokenizer.json`.
    pub tokenizer: PathBuf,
    /// Safetensors weight files (one entry unless sharded).
    pub weights: Vec<PathBuf>,
}

/// Resolve the files for `model_id`.
///
/// An existing local directory is used as-is. Anything else must be a
/// valid Hub repo id and is fetched (or found in the cache) via `hf-hub`.
///
/// # Errors
///
/// Returns [`BiasError::ModelLoad`] if the identifier is neither a local
/// directory nor a valid repo id, if a required file is missing, or if the
/// download fails. The underlying network or I/O message is preserved.
pub fn resolve_model_files(model_id: &str) -> Result<ModelFiles> {
    let local = Path::new(model_id);
    if local.is_dir() {
        tracing::debug!(path = %local.display(), "resolving model from local directory");
        return local_model_files(local);
    }
    validate_repo_id(model_id)?;
    hub_model_files(model_id)
}

/// Check that `repo_id` is a syntactically valid Hub repo id.
///
/// Accepts `name` or `owner/name`, where each part is non-empty, uses
/// ASCII alphanumerics and `-_.`, does not start or end with `-` or `.`,
/// and does not contain `--` or `..`.
///
/// # Errors
///
/// Returns [`BiasError::ModelLoad`] describing the first violation.
pub fn validate_repo_id(repo_id: &str) -> Result<()> {
    let invalid = |reason: &str| {
        BiasError::ModelLoad(format!(
            "invalid model identifier '{repo_id}': {reason} \
             (expected a local directory or a Hub repo id like 'bert-base-uncased' or 'owner/name')"
        ))
    };

    if repo_id.is_empty() {
        return Err(invalid("empty"));
    }
    if repo_id.len() > MAX_REPO_ID_LEN {
        return Err(invalid("too long"));
    }
    let parts: Vec<&str> = repo_id.split('/').collect();
    if parts.len() > 2 {
        return Err(invalid("too many '/' separators"));
    }
    for part in parts {
        if part.is_empty() {
            return Err(invalid("empty path segment"));
        }
        if !part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("only ASCII letters, digits, '-', '_' and '.' are allowed"));
        }
        if part.starts_with(['-', '.']) || part.ends_with(['-', '.']) {
            return Err(invalid("segments may not start or end with '-' or '.'"));
        }
        if part.contains("--") || part.contains("..") {
            return Err(invalid("'--' and '..' are not allowed"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Local directory
// ---------------------------------------------------------------------------

/// Resolve model files inside a local directory.
fn local_model_files(dir: &Path) -> Result<ModelFiles> {
    let require = |name: &str| -> Result<PathBuf> {
        let path = dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(BiasError::ModelLoad(format!(
                "{name} not found in {}",
                dir.display()
            )))
        }
    };

    let config = require("config.json")?;
    let tokenizer = require("tokenizer.json")?;

    let index_path = dir.join(SAFETENSORS_INDEX_FILE);
    let weights = if index_path.is_file() {
        shard_names(&index_path)?
            .iter()
            .map(|name| require(name.as_str()))
            .collect::<Result<Vec<_>>>()?
    } else {
        vec![require(SAFETENSORS_FILE)?]
    };

    Ok(ModelFiles {
        config,
        tokenizer,
        weights,
    })
}

// ---------------------------------------------------------------------------
// HuggingFace Hub
// ---------------------------------------------------------------------------

/// Fetch (or find in cache) the model files for a Hub repo.
fn hub_model_files(repo_id: &str) -> Result<ModelFiles> {
    let api = hf_hub::api::sync::ApiBuilder::new()
        .with_progress(false)
        .build()
        .map_err(|e| BiasError::ModelLoad(format!("HF Hub API: {e}")))?;
    let repo = api.model(repo_id.to_owned());

    let fetch = |name: &str| -> Result<PathBuf> {
        tracing::debug!(repo = repo_id, file = name, "fetching from HF Hub");
        repo.get(name)
            .map_err(|e| BiasError::ModelLoad(format!("{repo_id}/{name}: {e}")))
    };

    let config = fetch("config.json")?;
    let tokenizer = fetch("tokenizer.json")?;

    // Try sharded first, fall back to a single file.
    let weights = match repo.get(SAFETENSORS_INDEX_FILE) {
        Ok(index_path) => shard_names(&index_path)?
            .iter()
            .map(|name| fetch(name.as_str()))
            .collect::<Result<Vec<_>>>()?,
        Err(_) => vec![fetch(SAFETENSORS_FILE)?],
    };

    tracing::info!(repo = repo_id, shards = weights.len(), "model files ready");

    Ok(ModelFiles {
        config,
        tokenizer,
        weights,
    })
}

// ---------------------------------------------------------------------------
// Sharded checkpoints
// ---------------------------------------------------------------------------

/// Index structure for sharded safetensors models.
#[derive(serde::Deserialize)]
struct SafetensorsIndex {
    /// Maps weight name → shard filename.
    weight_map: HashMap<String, String>,
}

/// Read a `model.safetensors.index.json` and return its unique shard names,
/// sorted.
///
/// # Errors
///
/// Returns [`BiasError::ModelLoad`] if the index cannot be read or parsed.
pub fn shard_names(index_path: &Path) -> Result<Vec<String>> {
    let index_str = std::fs::read_to_string(index_path).map_err(|e| {
        BiasError::ModelLoad(format!("read {}: {e}", index_path.display()))
    })?;
    let index: SafetensorsIndex = serde_json::from_str(&index_str).map_err(|e| {
        BiasError::ModelLoad(format!("parse {}: {e}", index_path.display()))
    })?;

    let mut names: Vec<String> = index.weight_map.into_values().collect();
    names.sort();
    names.dedup();
    Ok(names)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_namespaced_repo_ids() {
        assert!(validate_repo_id("bert-base-uncased").is_ok());
        assert!(validate_repo_id("google-bert/bert-base-cased").is_ok());
        assert!(validate_repo_id("dbmdz/bert-base-german_cased.v2").is_ok());
    }

    #[test]
    fn rejects_malformed_repo_ids() {
        for bad in [
            "",
            "a/b/c",
            "/bert",
            "bert/",
            "bert base",
            "bert!",
            "-bert",
            "bert.",
            "owner/bert--base",
            "owner/..",
        ] {
            let err = validate_repo_id(bad).unwrap_err();
            assert!(matches!(err, BiasError::ModelLoad(_)), "{bad:?} accepted");
        }
        assert!(validate_repo_id(&"a".repeat(97)).is_err());
    }

    #[test]
    fn invalid_identifier_fails_before_network() {
        let err = resolve_model_files("definitely not a model!!").unwrap_err();
        assert!(err.to_string().contains("invalid model identifier"));
    }

    #[test]
    fn local_directory_with_single_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["config.json", "tokenizer.json", "model.safetensors"] {
            std::fs::write(dir.path().join(name), b"{}").unwrap();
        }
        let files = resolve_model_files(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(files.config, dir.path().join("config.json"));
        assert_eq!(files.tokenizer, dir.path().join("tokenizer.json"));
        assert_eq!(files.weights, vec![dir.path().join("model.safetensors")]);
    }

    #[test]
    fn local_directory_with_shards() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), b"{}").unwrap();
        std::fs::write(
            dir.path().join(SAFETENSORS_INDEX_FILE),
            r#"{"metadata": {}, "weight_map": {
                "a": "model-00002-of-00002.safetensors",
                "b": "model-00001-of-00002.safetensors",
                "c": "model-00001-of-00002.safetensors"
            }}"#,
        )
        .unwrap();
        for shard in [
            "model-00001-of-00002.safetensors",
            "model-00002-of-00002.safetensors",
        ] {
            std::fs::write(dir.path().join(shard), b"").unwrap();
        }

        let files = resolve_model_files(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(
            files.weights,
            vec![
                dir.path().join("model-00001-of-00002.safetensors"),
                dir.path().join("model-00002-of-00002.safetensors"),
            ]
        );
    }

    #[test]
    fn local_directory_missing_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_model_files(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, BiasError::ModelLoad(_)));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn local_directory_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), b"{}").unwrap();
        let err = resolve_model_files(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("model.safetensors"));
    }
}
