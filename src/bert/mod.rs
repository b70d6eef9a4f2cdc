// SPDX-License-Identifier: MIT OR Apache-2.0

//! BERT encoder with its masked-LM head.
//!
//! Loads `BertForMaskedLM` checkpoints (`bert.*` + `cls.predictions.*`)
//! and returns vocabulary logits for every position, parameterized by
//! [`BertConfig`](crate::config::BertConfig).

pub(crate) mod attention;
pub(crate) mod embeddings;
pub(crate) mod head;
pub(crate) mod mlp;
pub(crate) mod norm;

use candle_core::Tensor;
use candle_nn::VarBuilder;

use crate::backend::MaskedLmBackend;
use crate::config::{BertConfig, EncoderFamily};
use crate::error::{BiasError, Result};
use crate::util::masks;

use self::attention::Attention;
use self::embeddings::BertEmbeddings;
use self::head::MlmHead;
use self::mlp::Mlp;

// ---------------------------------------------------------------------------
// BertLayer
// ---------------------------------------------------------------------------

/// A single encoder layer: attention block then feed-forward block, each
/// with its own post-residual layer norm.
pub(crate) struct BertLayer {
    /// Self-attention block.
    attention: Attention,
    /// Feed-forward block.
    mlp: Mlp,
}

impl BertLayer {
    /// Load a single encoder layer.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) if weight loading fails.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    fn load(config: &BertConfig, vb: VarBuilder<'_>) -> Result<Self> {
        let attention = Attention::load(config, vb.pp("attention"))?;
        let mlp = Mlp::load(config, vb.clone())?;
        Ok(Self { attention, mlp })
    }

    /// Load a DistilBERT `transformer.layer.N`.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) if weight loading fails.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub(crate) fn load_distilbert(config: &BertConfig, vb: VarBuilder<'_>) -> Result<Self> {
        let attention = Attention::load_distilbert(config, vb.clone())?;
        let mlp = Mlp::load_distilbert(config, vb)?;
        Ok(Self { attention, mlp })
    }

    /// Run the layer.
    pub(crate) fn forward(&self, hidden: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let hidden = self.attention.forward(hidden, mask)?;
        self.mlp.forward(&hidden)
    }
}

// ---------------------------------------------------------------------------
// BertMaskedLm
// ---------------------------------------------------------------------------

/// BERT encoder plus masked-LM head.
pub struct BertMaskedLm {
    /// Input embeddings.
    embeddings: BertEmbeddings,
    /// Encoder layers.
    layers: Vec<BertLayer>,
    /// Vocabulary projection head.
    head: MlmHead,
    /// Model configuration.
    config: BertConfig,
}

impl BertMaskedLm {
    /// Load a BERT masked-LM from a [`VarBuilder`] at the checkpoint root.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Config`] if `config` is not a BERT config, and
    /// [`BiasError::Model`] if a tensor is missing or has the wrong shape
    /// (e.g. a checkpoint without the `cls.predictions` head).
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load(config: BertConfig, vb: VarBuilder<'_>) -> Result<Self> {
        if config.family != EncoderFamily::Bert {
            return Err(BiasError::Config(format!(
                "BERT loader given a {} config",
                config.family
            )));
        }
        let vb_bert = vb.pp("bert");

        // --- Embeddings ---
        let embeddings = BertEmbeddings::load(&config, vb_bert.pp("embeddings"))?;

        // --- Layers ---
        let mut layers = Vec::with_capacity(config.num_layers);
        for i in 0..config.num_layers {
            let vb_layer = vb_bert.pp(format!("encoder.layer.{i}"));
            layers.push(BertLayer::load(&config, vb_layer)?);
        }

        // --- MLM head ---
        let head = MlmHead::load(
            &config,
            embeddings.word_embeddings(),
            vb.pp("cls").pp("predictions"),
        )?;

        tracing::debug!(
            layers = config.num_layers,
            hidden = config.hidden_size,
            vocab = config.vocab_size,
            "loaded BERT masked-LM"
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

// ---------------------------------------------------------------------------
// MaskedLmBackend implementation
// ---------------------------------------------------------------------------

impl MaskedLmBackend for BertMaskedLm {
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

        let dtype = hidden.dtype();
        let mask = masks::create_padding_mask(attention_mask, dtype)?;

        for layer in &self.layers {
            hidden = layer.forward(&hidden, &mask)?;
        }

        self.head.forward(&hidden)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    use super::*;

    fn tiny_config(vocab_size: usize) -> BertConfig {
        BertConfig {
            family: crate::config::EncoderFamily::Bert,
            vocab_size,
            hidden_size: 16,
            num_layers: 2,
            num_attention_heads: 4,
            head_dim: 4,
            intermediate_size: 32,
            activation: crate::config::Activation::Gelu,
            max_position_embeddings: 32,
            type_vocab_size: 2,
            layer_norm_eps: 1e-12,
            pad_token_id: 0,
        }
    }

    #[test]
    fn forward_produces_vocab_logits_per_position() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = BertMaskedLm::load(tiny_config(20), vb).unwrap();

        let input_ids = Tensor::new(&[[1u32, 5, 7, 3, 2]], &device).unwrap();
        let token_types = input_ids.zeros_like().unwrap();
        let attention = input_ids.ones_like().unwrap();

        let logits = model.forward(&input_ids, &token_types, &attention).unwrap();
        assert_eq!(logits.dims(), &[1, 5, 20]);
        assert_eq!(model.vocab_size(), 20);
        assert_eq!(model.num_layers(), 2);
    }

    #[test]
    fn sequence_longer_than_positions_is_rejected() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = BertMaskedLm::load(tiny_config(20), vb).unwrap();

        let ids: Vec<u32> = vec![1; 40];
        let input_ids = Tensor::new(&ids[..], &device).unwrap().unsqueeze(0).unwrap();
        let token_types = input_ids.zeros_like().unwrap();
        let attention = input_ids.ones_like().unwrap();

        let err = model
            .forward(&input_ids, &token_types, &attention)
            .unwrap_err();
        assert!(err.to_string().contains("max_position_embeddings"));
    }

    #[test]
    fn padded_keys_do_not_change_real_positions() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = BertMaskedLm::load(tiny_config(20), vb).unwrap();

        let run = |ids: &[u32]| {
            let input_ids = Tensor::new(ids, &device).unwrap().unsqueeze(0).unwrap();
            let token_types = input_ids.zeros_like().unwrap();
            let attention = masks::attention_mask_from_ids(&input_ids, model.pad_token_id()).unwrap();
            model.forward(&input_ids, &token_types, &attention).unwrap()
        };

        let plain = run(&[2, 5, 10, 4, 3]);
        let padded = run(&[2, 5, 10, 4, 3, 0, 0]);
        assert_eq!(padded.dims(), &[1, 7, 20]);

        let diff = (plain - padded.narrow(1, 0, 5).unwrap())
            .unwrap()
            .abs()
            .unwrap()
            .max_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(diff < 1e-4, "padding leaked into real positions: {diff}");
    }
}
