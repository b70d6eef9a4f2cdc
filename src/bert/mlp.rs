// SPDX-License-Identifier: MIT OR Apache-2.0

//! Position-wise feed-forward block: `LayerNorm(x + out(act(inter(x))))`.

use candle_core::{Module, Tensor};
use candle_nn::{LayerNorm, Linear, VarBuilder};

use crate::config::{Activation, BertConfig};
use crate::error::Result;

use super::norm::layer_norm;

/// BERT feed-forward block (`intermediate` + `output`, or DistilBERT's
/// `ffn` + `output_layer_norm`).
pub struct Mlp {
    /// Up projection `[hidden_size, intermediate_size]`.
    intermediate: Linear,
    /// Down projection `[intermediate_size, hidden_size]`.
    output: Linear,
    /// Residual norm.
    output_norm: LayerNorm,
    /// Activation between the two projections.
    activation: Activation,
}

impl Mlp {
    /// Load feed-forward weights from a [`VarBuilder`] rooted at the layer.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) if weight loading fails.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load(config: &BertConfig, vb: VarBuilder<'_>) -> Result<Self> {
        let hidden = config.hidden_size;
        let inter = config.intermediate_size;

        let intermediate = candle_nn::linear(hidden, inter, vb.pp("intermediate").pp("dense"))?;
        let output = candle_nn::linear(inter, hidden, vb.pp("output").pp("dense"))?;
        let output_norm = layer_norm(
            hidden,
            config.layer_norm_eps,
            vb.pp("output").pp("LayerNorm"),
        )?;

        Ok(Self {
            intermediate,
            output,
            output_norm,
            activation: config.activation,
        })
    }

    /// Load DistilBERT feed-forward weights (`ffn.lin1`, `ffn.lin2`,
    /// `output_layer_norm`) from a [`VarBuilder`] rooted at the layer.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) if weight loading fails.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load_distilbert(config: &BertConfig, vb: VarBuilder<'_>) -> Result<Self> {
        let hidden = config.hidden_size;
        let inter = config.intermediate_size;

        let intermediate = candle_nn::linear(hidden, inter, vb.pp("ffn").pp("lin1"))?;
        let output = candle_nn::linear(inter, hidden, vb.pp("ffn").pp("lin2"))?;
        let output_norm = layer_norm(hidden, config.layer_norm_eps, vb.pp("output_layer_norm"))?;

        Ok(Self {
            intermediate,
            output,
            output_norm,
            activation: config.activation,
        })
    }

    /// Run the feed-forward block with its residual connection.
    ///
    /// # Shapes
    /// - `x`: `[batch, seq, hidden_size]`
    /// - returns: `[batch, seq, hidden_size]`
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`](crate::BiasError::Model) on tensor operation failures.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let hidden = apply_activation(&self.intermediate.forward(x)?, self.activation)?;
        let projected = self.output.forward(&hidden)?;
        Ok(self.output_norm.forward(&(projected + x)?)?)
    }
}

/// Apply the selected activation function.
pub(crate) fn apply_activation(x: &Tensor, activation: Activation) -> Result<Tensor> {
    match activation {
        Activation::Gelu => Ok(x.gelu_erf()?),
        Activation::GeluApprox => Ok(x.gelu()?),
        Activation::Relu => Ok(x.relu()?),
    }
}
