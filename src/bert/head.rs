// SPDX-License-Identifier: MIT OR Apache-2.0

//! Masked-LM prediction head (BERT `cls.predictions`, DistilBERT `vocab_*`).

use candle_core::{Module, Tensor};
use candle_nn::{LayerNorm, Linear, VarBuilder};

use crate::config::{Activation, BertConfig};
use crate::error::Result;

use super::mlp::apply_activation;
use super::norm::layer_norm;

/// `dense -> act -> LayerNorm -> decoder + bias`.
pub struct MlmHead {
    /// `transform.dense` / `vocab_transform`.
    transform: Linear,
    /// `transform.LayerNorm` / `vocab_layer_norm`.
    transform_norm: LayerNorm,
    /// Activation after the transform.
    activation: Activation,
    /// Vocabulary projection `[vocab_size, hidden_size]`.
    decoder_weight: Tensor,
    /// Per-token output bias `[vocab_size]`.
    decoder_bias: Tensor,
}

impl MlmHead {
    /// Load the head from a [`VarBuilder`] rooted at `cls.predictions`.
    ///
    /// When the checkpoint has no `decoder.weight`, the decoder is tied to
    /// `word_embeddings`.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) if weight loading fails.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load(config: &BertConfig, word_embeddings: &Tensor, vb: VarBuilder<'_>) -> Result<Self> {
        let hidden = config.hidden_size;
        let vocab = config.vocab_size;

        let transform = candle_nn::linear(hidden, hidden, vb.pp("transform").pp("dense"))?;
        let transform_norm = layer_norm(
            hidden,
            config.layer_norm_eps,
            vb.pp("transform").pp("LayerNorm"),
        )?;

        let decoder_weight = decoder_weight(config, word_embeddings, &vb, "decoder.weight")?;

        let decoder_bias = match vb.get(vocab, "bias") {
            Ok(bias) => bias,
            Err(_) => vb.get(vocab, "decoder.bias")?,
        };

        Ok(Self {
            transform,
            transform_norm,
            activation: config.activation,
            decoder_weight,
            decoder_bias,
        })
    }

    /// Load the DistilBERT head (`vocab_transform`, `vocab_layer_norm`,
    /// `vocab_projector`) from a [`VarBuilder`] at the checkpoint root.
    ///
    /// When the checkpoint has no `vocab_projector.weight`, the projector is
    /// tied to `word_embeddings`.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) if weight loading fails.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load_distilbert(
        config: &BertConfig,
        word_embeddings: &Tensor,
        vb: VarBuilder<'_>,
    ) -> Result<Self> {
        let hidden = config.hidden_size;

        let transform = candle_nn::linear(hidden, hidden, vb.pp("vocab_transform"))?;
        let transform_norm = layer_norm(hidden, config.layer_norm_eps, vb.pp("vocab_layer_norm"))?;
        let decoder_weight =
            decoder_weight(config, word_embeddings, &vb, "vocab_projector.weight")?;
        let decoder_bias = vb.get(config.vocab_size, "vocab_projector.bias")?;

        Ok(Self {
            transform,
            transform_norm,
            activation: config.activation,
            decoder_weight,
            decoder_bias,
        })
    }

    /// Project encoder output to vocabulary logits.
    ///
    /// # Shapes
    /// - `hidden`: `[batch, seq, hidden_size]`
    /// - returns: `[batch, seq, vocab_size]`
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) on tensor operation failures.
    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        let x = apply_activation(&self.transform.forward(hidden)?, self.activation)?;
        let x = self.transform_norm.forward(&x)?;
        // [batch, seq, d] @ [d, vocab] -> [batch, seq, vocab]
        let logits = x.broadcast_matmul(&self.decoder_weight.t()?)?;
        Ok(logits.broadcast_add(&self.decoder_bias)?)
    }
}

/// The untied decoder matrix at `name`, or the word embeddings when the
/// checkpoint stores the projection tied.
fn decoder_weight(
    config: &BertConfig,
    word_embeddings: &Tensor,
    vb: &VarBuilder<'_>,
    name: &str,
) -> Result<Tensor> {
    if vb.contains_tensor(name) {
        return Ok(vb.get((config.vocab_size, config.hidden_size), name)?);
    }
    tracing::debug!(name, "decoder weight absent, tying MLM decoder to word embeddings");
    // BORROW: explicit .clone() shares storage with the embedding table
    Ok(word_embeddings.clone())
}
