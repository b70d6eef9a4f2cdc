// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bidirectional multi-head self-attention with the post-attention
//! residual + layer norm.
//!
//! BERT names these `attention.self` and `attention.output`; DistilBERT
//! names them `attention.{q,k,v,out}_lin` and `sa_layer_norm`.

use candle_core::{DType, Module, Tensor};
use candle_nn::{LayerNorm, Linear, VarBuilder};

use crate::config::BertConfig;
use crate::error::Result;

use super::norm::layer_norm;

/// BERT-family self-attention block.
pub struct Attention {
    /// Query projection.
    query: Linear,
    /// Key projection.
    key: Linear,
    /// Value projection.
    value: Linear,
    /// Output projection (`attention.output.dense`).
    output: Linear,
    /// Residual norm (`attention.output.LayerNorm`).
    output_norm: LayerNorm,
    /// Number of heads.
    num_heads: usize,
    /// Dimension per head.
    head_dim: usize,
    /// `1/sqrt(head_dim)`.
    scale: f64,
}

impl Attention {
    /// Load attention weights from a [`VarBuilder`] rooted at `attention`.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) if weight loading fails.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load(config: &BertConfig, vb: VarBuilder<'_>) -> Result<Self> {
        let hidden = config.hidden_size;
        let vb_self = vb.pp("self");
        let vb_out = vb.pp("output");

        let query = candle_nn::linear(hidden, hidden, vb_self.pp("query"))?;
        let key = candle_nn::linear(hidden, hidden, vb_self.pp("key"))?;
        let value = candle_nn::linear(hidden, hidden, vb_self.pp("value"))?;
        let output = candle_nn::linear(hidden, hidden, vb_out.pp("dense"))?;
        let output_norm = layer_norm(hidden, config.layer_norm_eps, vb_out.pp("LayerNorm"))?;

        Ok(Self::from_parts(config, [query, key, value, output], output_norm))
    }

    /// Load DistilBERT attention weights from a [`VarBuilder`] rooted at the
    /// layer (`distilbert.transformer.layer.N`).
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) if weight loading fails.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load_distilbert(config: &BertConfig, vb: VarBuilder<'_>) -> Result<Self> {
        let hidden = config.hidden_size;
        let vb_attn = vb.pp("attention");

        let query = candle_nn::linear(hidden, hidden, vb_attn.pp("q_lin"))?;
        let key = candle_nn::linear(hidden, hidden, vb_attn.pp("k_lin"))?;
        let value = candle_nn::linear(hidden, hidden, vb_attn.pp("v_lin"))?;
        let output = candle_nn::linear(hidden, hidden, vb_attn.pp("out_lin"))?;
        let output_norm = layer_norm(hidden, config.layer_norm_eps, vb.pp("sa_layer_norm"))?;

        Ok(Self::from_parts(config, [query, key, value, output], output_norm))
    }

    /// Assemble the block from its `[query, key, value, output]` projections.
    fn from_parts(config: &BertConfig, projections: [Linear; 4], output_norm: LayerNorm) -> Self {
        let [query, key, value, output] = projections;

        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let scale = 1.0 / (config.head_dim as f64).sqrt();

        Self {
            query,
            key,
            value,
            output,
            output_norm,
            num_heads: config.num_attention_heads,
            head_dim: config.head_dim,
            scale,
        }
    }

    /// Run self-attention, then `LayerNorm(x + dense(context))`.
    ///
    /// # Shapes
    /// - `x`: `[batch, seq, hidden_size]`
    /// - `mask`: `[batch, 1, 1, seq]` -- additive padding mask
    /// - returns: `[batch, seq, hidden_size]`
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) on tensor operation failures.
    pub fn forward(&self, x: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, _hidden) = x.dims3()?;

        // [batch, seq, hidden] -> [batch, heads, seq, head_dim]
        let split_heads = |t: Tensor| -> Result<Tensor> {
            Ok(t.reshape((batch, seq_len, self.num_heads, self.head_dim))?
                .transpose(1, 2)?
                .contiguous()?)
        };
        let q = split_heads(self.query.forward(x)?)?;
        let k = split_heads(self.key.forward(x)?)?;
        let v = split_heads(self.value.forward(x)?)?;

        // CONTIGUOUS: transpose produces non-unit strides; matmul requires contiguous layout
        let k_t = k.transpose(2, 3)?.contiguous()?;
        let scores = (q.matmul(&k_t)? * self.scale)?;
        let scores = scores.broadcast_add(mask)?;

        // PROMOTE: softmax over F16/BF16 can produce NaN; compute in F32
        let original_dtype = scores.dtype();
        let scores_f32 = if original_dtype == DType::F32 {
            scores
        } else {
            scores.to_dtype(DType::F32)?
        };
        let mut pattern = candle_nn::ops::softmax_last_dim(&scores_f32)?;
        if original_dtype != DType::F32 {
            pattern = pattern.to_dtype(original_dtype)?;
        }

        let context = pattern.matmul(&v)?;
        let context = context.transpose(1, 2)?.contiguous()?.reshape((
            batch,
            seq_len,
            self.num_heads * self.head_dim,
        ))?;

        let projected = self.output.forward(&context)?;
        Ok(self.output_norm.forward(&(projected + x)?)?)
    }
}
