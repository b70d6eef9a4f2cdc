// SPDX-License-Identifier: MIT OR Apache-2.0

//! Additive attention masks for the bidirectional encoder.

use candle_core::{DType, Tensor};

use crate::error::Result;

/// Value added to attention scores at padded key positions.
pub const MASKED_SCORE: f64 = -10_000.0;

/// Build a `0/1` padding mask from token ids: `1` wherever the id is not
/// `pad_token_id`.
///
/// # Shapes
/// - `input_ids`: `[batch, seq]`
/// - returns: `[batch, seq]` as `u8`
///
/// # Errors
///
/// Returns [`BiasError::Model`](crate::BiasError::Model) on tensor
/// operation failures.
pub fn attention_mask_from_ids(input_ids: &Tensor, pad_token_id: u32) -> Result<Tensor> {
    Ok(input_ids.ne(pad_token_id)?)
}

/// Turn a `0/1` padding mask into an additive attention mask.
///
/// Kept positions (`1`) contribute `0.0`; padded positions (`0`)
/// contribute [`MASKED_SCORE`], which the softmax drives to zero.
///
/// # Shapes
/// - `attention_mask`: `[batch, seq]` -- any integer or float dtype
/// - returns: `[batch, 1, 1, seq]` in `dtype`
///
/// # Errors
///
/// Returns [`BiasError::Model`](crate::BiasError::Model) on tensor
/// operation failures or if the mask is not 2-D.
pub fn create_padding_mask(attention_mask: &Tensor, dtype: DType) -> Result<Tensor> {
    let (_batch, _seq) = attention_mask.dims2()?;
    let mask = attention_mask.to_dtype(DType::F32)?;
    // 1 -> 0, 0 -> MASKED_SCORE
    let additive = mask.affine(-MASKED_SCORE, MASKED_SCORE)?;
    Ok(additive.unsqueeze(1)?.unsqueeze(1)?.to_dtype(dtype)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn padding_positions_are_masked() {
        let mask = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu).unwrap();
        let additive = create_padding_mask(&mask, DType::F32).unwrap();
        assert_eq!(additive.dims(), &[1, 1, 1, 3]);

        let values: Vec<f32> = additive.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values, vec![0.0, 0.0, -10_000.0]);
    }

    #[test]
    fn pad_ids_become_zero() {
        let ids = Tensor::new(&[[2u32, 7, 3, 0, 0]], &Device::Cpu).unwrap();
        let mask = attention_mask_from_ids(&ids, 0).unwrap();
        let values: Vec<u8> = mask.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values, vec![1, 1, 1, 0, 0]);

        let additive = create_padding_mask(&mask, DType::F32).unwrap();
        let values: Vec<f32> = additive.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values, vec![0.0, 0.0, 0.0, -10_000.0, -10_000.0]);
    }

    #[test]
    fn non_zero_pad_id_is_honored() {
        let ids = Tensor::new(&[[0u32, 1, 5, 1]], &Device::Cpu).unwrap();
        let mask = attention_mask_from_ids(&ids, 1).unwrap();
        let values: Vec<u8> = mask.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values, vec![1, 0, 1, 0]);
    }

    #[test]
    fn rejects_non_2d_mask() {
        let mask = Tensor::new(&[1u32, 1, 0], &Device::Cpu).unwrap();
        assert!(create_padding_mask(&mask, DType::F32).is_err());
    }
}
