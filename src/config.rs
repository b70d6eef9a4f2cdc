// SPDX-License-Identifier: MIT OR Apache-2.0

//! BERT-family configuration and `HuggingFace` `config.json` parsing.
//!
//! [`BertConfig`] captures the handful of axes the masked-LM forward pass
//! needs: dimensions, activation, layer-norm epsilon, and position/type
//! vocabulary sizes. BERT and DistilBERT checkpoints both parse into it;
//! [`EncoderFamily`] records which weight layout to load.
//!
//! # Usage
//!
//! ```
//! use bias_radar::BertConfig;
//!
//! let config_str = r#"{"model_type": "bert", "hidden_size": 768,
//!     "num_hidden_layers": 12, "num_attention_heads": 12,
//!     "intermediate_size": 3072, "vocab_size": 30522}"#;
//! let json: serde_json::Value = serde_json::from_str(config_str).unwrap();
//! let config = BertConfig::from_hf_config(&json).unwrap();
//! assert_eq!(config.head_dim, 64);
//! ```

use std::fmt;

use serde_json::Value;

use crate::error::{BiasError, Result};

// ---------------------------------------------------------------------------
// Configuration enums
// ---------------------------------------------------------------------------

/// Checkpoint layout of a BERT-family masked-LM.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderFamily {
    /// `BertForMaskedLM`: `bert.*` encoder, `cls.predictions.*` head.
    Bert,
    /// `DistilBertForMaskedLM`: `distilbert.*` encoder, `vocab_*` head,
    /// no token-type embeddings.
    DistilBert,
}

impl fmt::Display for EncoderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bert => write!(f, "BERT"),
            Self::DistilBert => write!(f, "DistilBERT"),
        }
    }
}

/// Activation function used in the feed-forward block and the MLM head.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Gaussian Error Linear Unit, exact (erf) variant. BERT's default.
    Gelu,
    /// Gaussian Error Linear Unit, tanh approximation (`gelu_new`).
    GeluApprox,
    /// Rectified linear unit.
    Relu,
}

impl Activation {
    /// Map a `hidden_act` string from `config.json`.
    fn from_hf_name(name: &str) -> Result<Self> {
        match name {
            "gelu" => Ok(Self::Gelu),
            "gelu_new" | "gelu_pytorch_tanh" | "gelu_fast" => Ok(Self::GeluApprox),
            "relu" => Ok(Self::Relu),
            other => Err(BiasError::Config(format!(
                "unsupported hidden_act: '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gelu => write!(f, "GELU"),
            Self::GeluApprox => write!(f, "GELU (tanh approx)"),
            Self::Relu => write!(f, "ReLU"),
        }
    }
}

// ---------------------------------------------------------------------------
// BertConfig
// ---------------------------------------------------------------------------

/// Configuration for a BERT-family encoder with a masked-LM head.
#[derive(Debug, Clone, PartialEq)]
pub struct BertConfig {
    /// Which checkpoint layout the weights follow.
    pub family: EncoderFamily,
    /// Vocabulary size.
    pub vocab_size: usize,
    /// Hidden dimension (`d_model`).
    pub hidden_size: usize,
    /// Number of encoder layers.
    pub num_layers: usize,
    /// Number of attention heads.
    pub num_attention_heads: usize,
    /// Dimension per head (`hidden_size / num_attention_heads`).
    pub head_dim: usize,
    /// Feed-forward intermediate dimension.
    pub intermediate_size: usize,
    /// Activation for the feed-forward block and MLM head transform.
    pub activation: Activation,
    /// Maximum sequence length supported by the position embeddings.
    pub max_position_embeddings: usize,
    /// Number of token-type (segment) embeddings; `0` when the family has none.
    pub type_vocab_size: usize,
    /// Epsilon for every layer norm.
    pub layer_norm_eps: f64,
    /// Padding token id.
    pub pad_token_id: u32,
}

impl BertConfig {
    /// Parse a [`BertConfig`] from a `HuggingFace` `config.json` value.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Config`] if `model_type` is missing or is
    /// neither `bert` nor `distilbert`, if required fields are absent, or
    /// if the hidden size is not divisible by the head count.
    pub fn from_hf_config(config: &Value) -> Result<Self> {
        let model_type = config
            .get("model_type")
            .and_then(Value::as_str)
            .ok_or_else(|| BiasError::Config("missing 'model_type' field".into()))?;

        match model_type {
            "bert" => Self::parse_bert(config),
            "distilbert" => Self::parse_distilbert(config),
            other => Err(BiasError::Config(format!(
                "unsupported model_type: '{other}' (expected a BERT or DistilBERT fill-mask model)"
            ))),
        }
    }

    /// Parse a BERT config (`bert-base-uncased`, `bert-large-cased`, ...).
    fn parse_bert(config: &Value) -> Result<Self> {
        let hidden_size = get_usize(config, "hidden_size")?;
        let num_attention_heads = get_usize(config, "num_attention_heads")?;
        check_heads(hidden_size, num_attention_heads)?;

        let activation = match config.get("hidden_act").and_then(Value::as_str) {
            Some(name) => Activation::from_hf_name(name)?,
            None => Activation::Gelu,
        };

        Ok(Self {
            family: EncoderFamily::Bert,
            vocab_size: get_usize(config, "vocab_size")?,
            hidden_size,
            num_layers: get_usize(config, "num_hidden_layers")?,
            num_attention_heads,
            head_dim: hidden_size / num_attention_heads,
            intermediate_size: get_usize(config, "intermediate_size")?,
            activation,
            max_position_embeddings: get_usize_or(config, "max_position_embeddings", 512),
            type_vocab_size: get_usize_or(config, "type_vocab_size", 2),
            layer_norm_eps: get_f64_or(config, "layer_norm_eps", 1e-12),
            pad_token_id: get_u32_or(config, "pad_token_id", 0),
        })
    }

    /// Parse a DistilBERT config (`distilbert-base-uncased`, ...).
    ///
    /// DistilBERT names its axes `dim`, `n_layers`, `n_heads` and
    /// `hidden_dim`, reads the activation from `activation`, and fixes the
    /// layer-norm epsilon at `1e-12`.
    fn parse_distilbert(config: &Value) -> Result<Self> {
        let hidden_size = get_usize(config, "dim")?;
        let num_attention_heads = get_usize(config, "n_heads")?;
        check_heads(hidden_size, num_attention_heads)?;

        let activation = match config.get("activation").and_then(Value::as_str) {
            Some(name) => Activation::from_hf_name(name)?,
            None => Activation::Gelu,
        };

        Ok(Self {
            family: EncoderFamily::DistilBert,
            vocab_size: get_usize(config, "vocab_size")?,
            hidden_size,
            num_layers: get_usize(config, "n_layers")?,
            num_attention_heads,
            head_dim: hidden_size / num_attention_heads,
            intermediate_size: get_usize(config, "hidden_dim")?,
            activation,
            max_position_embeddings: get_usize_or(config, "max_position_embeddings", 512),
            type_vocab_size: 0,
            layer_norm_eps: 1e-12,
            pad_token_id: get_u32_or(config, "pad_token_id", 0),
        })
    }
}

/// Reject a head count that does not evenly split the hidden size.
fn check_heads(hidden_size: usize, num_attention_heads: usize) -> Result<()> {
    if num_attention_heads == 0 || hidden_size % num_attention_heads != 0 {
        return Err(BiasError::Config(format!(
            "hidden size {hidden_size} is not divisible by {num_attention_heads} attention heads"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON extraction helpers
// ---------------------------------------------------------------------------

/// Extract a required `usize` field from a JSON object.
fn get_usize(config: &Value, key: &str) -> Result<usize> {
    let val = config
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| BiasError::Config(format!("missing or invalid field '{key}'")))?;
    usize::try_from(val)
        .map_err(|_| BiasError::Config(format!("field '{key}' value {val} overflows usize")))
}

/// Extract an optional `usize` field, returning a default if absent.
fn get_usize_or(config: &Value, key: &str, default: usize) -> usize {
    config
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// Extract an optional `u32` field, returning a default if absent.
fn get_u32_or(config: &Value, key: &str, default: u32) -> u32 {
    config
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(default)
}

/// Extract an `f64` field, returning a default if absent.
fn get_f64_or(config: &Value, key: &str, default: f64) -> f64 {
    config.get(key).and_then(Value::as_f64).unwrap_or(default)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// `config.json` of `bert-base-uncased`, trimmed to the fields we read.
    fn bert_base_json() -> Value {
        serde_json::json!({
            "architectures": ["BertForMaskedLM"],
            "model_type": "bert",
            "hidden_act": "gelu",
            "hidden_size": 768,
            "intermediate_size": 3072,
            "layer_norm_eps": 1e-12,
            "max_position_embeddings": 512,
            "num_attention_heads": 12,
            "num_hidden_layers": 12,
            "pad_token_id": 0,
            "type_vocab_size": 2,
            "vocab_size": 30522
        })
    }

    /// `config.json` of `distilbert-base-uncased`, trimmed to the fields we read.
    fn distilbert_base_json() -> Value {
        serde_json::json!({
            "activation": "gelu",
            "architectures": ["DistilBertForMaskedLM"],
            "dim": 768,
            "hidden_dim": 3072,
            "max_position_embeddings": 512,
            "model_type": "distilbert",
            "n_heads": 12,
            "n_layers": 6,
            "pad_token_id": 0,
            "sinusoidal_pos_embds": false,
            "tie_weights_": true,
            "vocab_size": 30522
        })
    }

    #[test]
    fn parse_bert_base() {
        let config = BertConfig::from_hf_config(&bert_base_json()).unwrap();
        assert_eq!(config.family, EncoderFamily::Bert);
        assert_eq!(config.hidden_size, 768);
        assert_eq!(config.num_layers, 12);
        assert_eq!(config.num_attention_heads, 12);
        assert_eq!(config.head_dim, 64);
        assert_eq!(config.intermediate_size, 3072);
        assert_eq!(config.vocab_size, 30522);
        assert_eq!(config.activation, Activation::Gelu);
        assert_eq!(config.max_position_embeddings, 512);
        assert_eq!(config.type_vocab_size, 2);
        assert_eq!(config.pad_token_id, 0);
        assert!((config.layer_norm_eps - 1e-12).abs() < f64::EPSILON);
    }

    #[test]
    fn optional_fields_default() {
        let json = serde_json::json!({
            "model_type": "bert",
            "hidden_size": 128,
            "num_hidden_layers": 2,
            "num_attention_heads": 2,
            "intermediate_size": 512,
            "vocab_size": 1000
        });
        let config = BertConfig::from_hf_config(&json).unwrap();
        assert_eq!(config.activation, Activation::Gelu);
        assert_eq!(config.max_position_embeddings, 512);
        assert_eq!(config.type_vocab_size, 2);
    }

    #[test]
    fn gelu_new_maps_to_tanh_approx() {
        let mut json = bert_base_json();
        json["hidden_act"] = Value::from("gelu_new");
        let config = BertConfig::from_hf_config(&json).unwrap();
        assert_eq!(config.activation, Activation::GeluApprox);
    }

    #[test]
    fn unknown_activation_errors() {
        let mut json = bert_base_json();
        json["hidden_act"] = Value::from("swish");
        assert!(BertConfig::from_hf_config(&json).is_err());
    }

    #[test]
    fn indivisible_heads_error() {
        let mut json = bert_base_json();
        json["num_attention_heads"] = Value::from(7);
        assert!(BertConfig::from_hf_config(&json).is_err());
    }

    #[test]
    fn decoder_model_type_errors() {
        let json = serde_json::json!({ "model_type": "llama", "hidden_size": 2048 });
        let err = BertConfig::from_hf_config(&json).unwrap_err();
        assert!(err.to_string().contains("llama"));
    }

    #[test]
    fn missing_model_type_errors() {
        let json = serde_json::json!({ "hidden_size": 768 });
        assert!(BertConfig::from_hf_config(&json).is_err());
    }

    #[test]
    fn missing_vocab_size_errors() {
        let mut json = bert_base_json();
        json.as_object_mut().unwrap().remove("vocab_size");
        let err = BertConfig::from_hf_config(&json).unwrap_err();
        assert!(err.to_string().contains("vocab_size"));
    }

    #[test]
    fn parse_distilbert_base() {
        let config = BertConfig::from_hf_config(&distilbert_base_json()).unwrap();
        assert_eq!(config.family, EncoderFamily::DistilBert);
        assert_eq!(config.hidden_size, 768);
        assert_eq!(config.num_layers, 6);
        assert_eq!(config.num_attention_heads, 12);
        assert_eq!(config.head_dim, 64);
        assert_eq!(config.intermediate_size, 3072);
        assert_eq!(config.vocab_size, 30522);
        assert_eq!(config.activation, Activation::Gelu);
        assert_eq!(config.max_position_embeddings, 512);
        assert_eq!(config.type_vocab_size, 0);
        assert_eq!(config.pad_token_id, 0);
    }

    #[test]
    fn distilbert_relu_activation() {
        let mut json = distilbert_base_json();
        json["activation"] = Value::from("relu");
        let config = BertConfig::from_hf_config(&json).unwrap();
        assert_eq!(config.activation, Activation::Relu);
    }

    #[test]
    fn distilbert_missing_dim_errors() {
        let mut json = distilbert_base_json();
        json.as_object_mut().unwrap().remove("dim");
        let err = BertConfig::from_hf_config(&json).unwrap_err();
        assert!(err.to_string().contains("dim"));
    }

    #[test]
    fn distilbert_indivisible_heads_error() {
        let mut json = distilbert_base_json();
        json["n_heads"] = Value::from(5);
        assert!(BertConfig::from_hf_config(&json).is_err());
    }

    #[test]
    fn distilbert_pad_token_is_read() {
        let mut json = distilbert_base_json();
        json["pad_token_id"] = Value::from(3);
        let config = BertConfig::from_hf_config(&json).unwrap();
        assert_eq!(config.pad_token_id, 3);
    }
}
