// SPDX-License-Identifier: MIT OR Apache-2.0

//! Word + position (+ token-type) embeddings followed by layer norm.

use candle_core::{Module, Tensor};
use candle_nn::{Embedding, LayerNorm, VarBuilder};

use crate::config::BertConfig;
use crate::error::{BiasError, Result};

use super::norm::layer_norm;

/// BERT input embeddings.
pub struct BertEmbeddings {
    /// Token embedding matrix `[vocab_size, hidden_size]`; also the tied
    /// decoder of the MLM head.
    word_embeddings: Embedding,
    /// Learned absolute positions `[max_position_embeddings, hidden_size]`.
    position_embeddings: Embedding,
    /// Segment embeddings `[type_vocab_size, hidden_size]`; absent for
    /// DistilBERT.
    token_type_embeddings: Option<Embedding>,
    /// Post-sum normalization.
    layer_norm: LayerNorm,
    /// Longest sequence the position table covers.
    max_positions: usize,
}

impl BertEmbeddings {
    /// Load embedding tables from a [`VarBuilder`] rooted at `bert.embeddings`
    /// or `distilbert.embeddings`.
    ///
    /// The token-type table is only loaded when `type_vocab_size` is
    /// non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`] if weight loading fails.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load(config: &BertConfig, vb: VarBuilder<'_>) -> Result<Self> {
        let word_embeddings = candle_nn::embedding(
            config.vocab_size,
            config.hidden_size,
            vb.pp("word_embeddings"),
        )?;
        let position_embeddings = candle_nn::embedding(
            config.max_position_embeddings,
            config.hidden_size,
            vb.pp("position_embeddings"),
        )?;
        let token_type_embeddings = if config.type_vocab_size == 0 {
            None
        } else {
            Some(candle_nn::embedding(
                config.type_vocab_size,
                config.hidden_size,
                vb.pp("token_type_embeddings"),
            )?)
        };
        let layer_norm = layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?;

        Ok(Self {
            word_embeddings,
            position_embeddings,
            token_type_embeddings,
            layer_norm,
            max_positions: config.max_position_embeddings,
        })
    }

    /// The word embedding matrix.
    ///
    /// # Shapes
    /// - returns: `[vocab_size, hidden_size]`
    #[must_use]
    pub fn word_embeddings(&self) -> &Tensor {
        self.word_embeddings.embeddings()
    }

    /// Embed a batch of token ids.
    ///
    /// # Shapes
    /// - `input_ids`: `[batch, seq]`
    /// - `token_type_ids`: `[batch, seq]` -- ignored without a token-type table
    /// - returns: `[batch, seq, hidden_size]`
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Inference`] if the sequence is longer than the
    /// position table, and [`BiasError::Model`] on tensor failures.
    pub fn forward(&self, input_ids: &Tensor, token_type_ids: &Tensor) -> Result<Tensor> {
        let (_batch, seq_len) = input_ids.dims2()?;
        if seq_len > self.max_positions {
            return Err(BiasError::Inference(format!(
                "sequence of {seq_len} tokens exceeds max_position_embeddings {}",
                self.max_positions
            )));
        }
        let seq_len = u32::try_from(seq_len)
            .map_err(|_| BiasError::Inference(format!("sequence length {seq_len} overflows u32")))?;

        let position_ids = Tensor::arange(0u32, seq_len, input_ids.device())?;

        let mut words = self.word_embeddings.forward(input_ids)?;
        if let Some(token_types) = &self.token_type_embeddings {
            words = (words + token_types.forward(token_type_ids)?)?;
        }
        let positions = self.position_embeddings.forward(&position_ids)?;

        // [batch, seq, d] + [seq, d]
        let summed = words.broadcast_add(&positions)?;
        Ok(self.layer_norm.forward(&summed)?)
    }
}
