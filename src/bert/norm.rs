// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layer normalization loader for BERT checkpoints.
//!
//! Original Google checkpoints name the affine parameters `gamma`/`beta`;
//! later conversions use `weight`/`bias`. Both layouts load into the same
//! [`candle_nn::LayerNorm`].

use candle_nn::{Init, LayerNorm, VarBuilder};

use crate::error::Result;

/// Load a [`LayerNorm`] of width `size`, accepting either naming scheme.
///
/// # Errors
///
/// Returns [`BiasError::Model`](crate::BiasError::Model) if neither
/// `weight`/`bias` nor `gamma`/`beta` can be loaded.
#[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
pub fn layer_norm(size: usize, eps: f64, vb: VarBuilder<'_>) -> Result<LayerNorm> {
    let weight = vb.get_with_hints(size, "weight", Init::Const(1.0));
    let bias = vb.get_with_hints(size, "bias", Init::Const(0.0));

    let (weight, bias) = match (weight, bias) {
        (Ok(weight), Ok(bias)) => (weight, bias),
        (Err(err), _) | (_, Err(err)) => {
            match (vb.get(size, "gamma"), vb.get(size, "beta")) {
                (Ok(gamma), Ok(beta)) => (gamma, beta),
                _ => return Err(err.into()),
            }
        }
    };

    Ok(LayerNorm::new(weight, bias, eps))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use candle_core::{DType, Device, Module, Tensor};

    use super::*;

    #[test]
    fn loads_legacy_gamma_beta_names() {
        let device = Device::Cpu;
        let mut tensors = HashMap::new();
        tensors.insert(
            "LayerNorm.gamma".to_string(),
            Tensor::new(&[2.0f32, 2.0], &device).unwrap(),
        );
        tensors.insert(
            "LayerNorm.beta".to_string(),
            Tensor::new(&[1.0f32, 1.0], &device).unwrap(),
        );
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);

        let norm = layer_norm(2, 1e-12, vb.pp("LayerNorm")).unwrap();
        let xs = Tensor::new(&[[[1.0f32, 3.0]]], &device).unwrap();
        let out: Vec<f32> = norm.forward(&xs).unwrap().flatten_all().unwrap().to_vec1().unwrap();

        // normalized [-1, 1], scaled by 2, shifted by 1
        assert!((out[0] + 1.0).abs() < 1e-4);
        assert!((out[1] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn missing_parameters_error() {
        let device = Device::Cpu;
        let vb = VarBuilder::from_tensors(HashMap::new(), DType::F32, &device);
        assert!(layer_norm(4, 1e-12, vb.pp("LayerNorm")).is_err());
    }
}
