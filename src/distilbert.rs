// SPDX-License-Identifier: MIT OR Apache-2.0

//! DistilBERT encoder with its masked-LM head.
//!
//! Loads `DistilBertForMaskedLM` checkpoints (`distilbert.*` plus the
//! `vocab_transform` / `vocab_layer_norm` / `vocab_projector` head). The
//! layers are the BERT blocks under DistilBERT's weight names; there are
//! no token-type embeddings, so `token_type_ids` is ignored.

use candle_core::Tensor;
use candle_nn::VarBuilder;

use crate::backend::MaskedLmBackend;
use crate::bert::BertLayer;
use crate::bert::embeddings::BertEmbeddings;
use crate::bert::head::MlmHead;
use crate::config::{BertConfig, EncoderFamily};
use crate::error::{BiasError, Result};
use crate::util::masks;

/// DistilBERT encoder plus masked-LM head.
pub struct DistilBertMaskedLm {
    /// Word and position embeddings.
    embeddings: BertEmbeddings,
    /// Transformer layers.
    layers: Vec<BertLayer>,
    /// Vocabulary projection head.
    head: MlmHead,
    /// Model configuration.
    config: BertConfig,
}

impl DistilBertMaskedLm {
    /// Load a DistilBERT masked-LM from a [`VarBuilder`] at the checkpoint root.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Config`] if `config` is not a DistilBERT config,
    /// and [`BiasError::Model`] if a tensor is missing or has the wrong shape.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load(config: BertConfig, vb: VarBuilder<'_>) -> Result<Self> {
        if config.family != EncoderFamily::DistilBert {
            return Err(BiasError::Config(format!(
                "DistilBERT loader given a {} config",
                config.family
            )));
        }
        let vb_distil = vb.pp("distilbert");

        // --- Embeddings ---
        let embeddings = BertEmbeddings::load(&config, vb_distil.pp("embeddings"))?;

        // --- Layers ---
        let mut layers = Vec::with_capacity(config.num_layers);
        for i in 0..config.num_layers {
            let vb_layer = vb_distil.pp(format!("transformer.layer.{i}"));
            layers.push(BertLayer::load_distilbert(&config, vb_layer)?);
        }

        // --- MLM head ---
        let head = MlmHead::load_distilbert(&config, embeddings.word_embeddings(), vb)?;

        tracing::debug!(
            layers = config.num_layers,
            hidden = config.hidden_size,
            vocab = config.vocab_size,
            "loaded DistilBERT masked-LM"
        );

        Ok(Self {
            embeddings,
            layers,
            head,
            config,
        })
    }

    /// Access the model configuration.
    #[must_use]
    pub const fn config(&self) -> &BertConfig {
        &self.config
    }
}

impl MaskedLmBackend for DistilBertMaskedLm {
    fn num_layers(&self) -> usize {
        self.config.num_layers
    }

    fn hidden_size(&self) -> usize {
        self.config.hidden_size
    }

    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn pad_token_id(&self) -> u32 {
        self.config.pad_token_id
    }

    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let mut hidden = self.embeddings.forward(input_ids, token_type_ids)?;

        let mask = masks::create_padding_mask(attention_mask, hidden.dtype())?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden, &mask)?;
        }

        self.head.forward(&hidden)
    }
}
