// SPDX-License-Identifier: MIT OR Apache-2.0

//! Masked-LM backend trait and the fill-mask model wrapper.
//!
//! [`MaskedLmBackend`] is the trait every encoder implements.
//! [`FillMaskModel`] pairs a backend with its tokenizer and device and
//! implements [`FillMask`] on top of them.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;

use crate::bert::BertMaskedLm;
use crate::config::{BertConfig, EncoderFamily};
use crate::distilbert::DistilBertMaskedLm;
use crate::download::resolve_model_files;
use crate::error::{BiasError, Result};
use crate::fill_mask::{CandidateProbabilities, FillMask, mask_probabilities};
use crate::tokenizer::MlmTokenizer;
use crate::util::masks;

// ---------------------------------------------------------------------------
// MaskedLmBackend trait
// ---------------------------------------------------------------------------

/// Unified interface for bidirectional encoders with a masked-LM head.
pub trait MaskedLmBackend: Send + Sync {
    /// Number of encoder layers.
    fn num_layers(&self) -> usize;

    /// Hidden dimension (`d_model`).
    fn hidden_size(&self) -> usize;

    /// Vocabulary size.
    fn vocab_size(&self) -> usize;

    /// Token id whose positions are excluded from attention.
    fn pad_token_id(&self) -> u32;

    /// Full forward pass returning vocabulary logits at every position.
    ///
    /// # Shapes
    /// - `input_ids`: `[batch, seq]` -- token IDs
    /// - `token_type_ids`: `[batch, seq]` -- segment IDs
    /// - `attention_mask`: `[batch, seq]` -- `1` for real tokens, `0` for padding
    /// - returns: `[batch, seq, vocab_size]`
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`] on tensor operation failures.
    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor>;
}

// ---------------------------------------------------------------------------
// FillMaskModel
// ---------------------------------------------------------------------------

/// A loaded fill-mask inference session.
pub struct FillMaskModel {
    /// The underlying encoder.
    // TRAIT_OBJECT: heterogeneous encoder backends require dynamic dispatch
    backend: Box<dyn MaskedLmBackend>,
    /// Tokenizer matching the backend's vocabulary.
    tokenizer: MlmTokenizer,
    /// The device the backend lives on.
    device: Device,
}

impl FillMaskModel {
    /// Load a fill-mask model from a `HuggingFace` model ID or local directory.
    ///
    /// Checks for a local directory first, otherwise resolves the files
    /// through the `HuggingFace` cache (downloading if necessary).
    ///
    /// # `DType` selection
    ///
    /// - **CUDA**: `BF16`
    /// - **CPU**: `F32` for full precision
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::ModelLoad`] if the files cannot be resolved,
    /// [`BiasError::Config`] if the model type is unsupported or the
    /// tokenizer vocabulary is larger than the model's,
    /// [`BiasError::Tokenizer`] if the tokenizer has no mask token, or
    /// [`BiasError::Model`] if weight loading fails.
    pub fn from_pretrained(model_id: &str) -> Result<Self> {
        // --- Device and dtype ---
        let device = Self::select_device()?;
        let dtype = if device.is_cuda() {
            DType::BF16
        } else {
            DType::F32
        };

        // --- Resolve local or cached files ---
        let files = resolve_model_files(model_id)?;

        let config_str = std::fs::read_to_string(&files.config)
            .map_err(|e| BiasError::Config(format!("read config.json: {e}")))?;
        let json: serde_json::Value = serde_json::from_str(&config_str)
            .map_err(|e| BiasError::Config(format!("parse config.json: {e}")))?;
        let config = BertConfig::from_hf_config(&json)?;

        // --- Load weights and tokenizer ---
        let family = config.family;
        let vb = create_var_builder(&files.weights, dtype, &device)?;
        let backend = load_backend(config, vb)?;
        let tokenizer = MlmTokenizer::from_hf_path(&files.tokenizer)?;
        check_vocab(&tokenizer, backend.as_ref())?;

        tracing::info!(model = model_id, %family, device = ?device, "fill-mask model loaded");

        Ok(Self::new(backend, tokenizer, device))
    }

    /// Select the best available device (CUDA GPU 0, or CPU fallback).
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Model`] on device detection failure.
    fn select_device() -> Result<Device> {
        match Device::cuda_if_available(0) {
            Ok(dev) => Ok(dev),
            Err(e) => Err(BiasError::Model(e)),
        }
    }

    /// Wrap an existing backend and tokenizer.
    // TRAIT_OBJECT: heterogeneous encoder backends require dynamic dispatch
    #[must_use]
    pub fn new(backend: Box<dyn MaskedLmBackend>, tokenizer: MlmTokenizer, device: Device) -> Self {
        Self {
            backend,
            tokenizer,
            device,
        }
    }

    /// The device this model lives on.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// The tokenizer paired with the backend.
    #[must_use]
    pub const fn tokenizer(&self) -> &MlmTokenizer {
        &self.tokenizer
    }

    /// Number of encoder layers.
    #[must_use]
    pub fn num_layers(&self) -> usize {
        self.backend.num_layers()
    }

    /// Hidden dimension.
    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.backend.hidden_size()
    }

    /// Vocabulary size.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.backend.vocab_size()
    }

    /// Vocabulary probabilities at the single mask position of `sentence`.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Inference`] if the sentence does not contain
    /// exactly one mask token or the logits have an unexpected shape.
    pub fn mask_distribution(&self, sentence: &str) -> Result<Vec<f32>> {
        let token_ids = self.tokenizer.encode(sentence)?;
        let mask_id = self.tokenizer.mask_token_id();

        let mut mask_positions = token_ids
            .iter()
            .enumerate()
            .filter(|&(_, &id)| id == mask_id)
            .map(|(pos, _)| pos);
        let mask_pos = mask_positions.next().ok_or_else(|| {
            BiasError::Inference(format!("no mask token in \"{sentence}\""))
        })?;
        if mask_positions.next().is_some() {
            return Err(BiasError::Inference(format!(
                "more than one mask token in \"{sentence}\""
            )));
        }

        let input = Tensor::new(&token_ids[..], &self.device)?.unsqueeze(0)?; // [1, seq_len]
        let token_types = input.zeros_like()?;
        let attention = masks::attention_mask_from_ids(&input, self.backend.pad_token_id())?;

        let logits = self.backend.forward(&input, &token_types, &attention)?;
        let (batch, seq_len, vocab) = logits.dims3().map_err(|e| {
            BiasError::Inference(format!("expected [batch, seq, vocab] logits: {e}"))
        })?;
        if batch != 1 || seq_len != token_ids.len() {
            return Err(BiasError::Inference(format!(
                "logits shape [{batch}, {seq_len}, {vocab}] does not match {} input tokens",
                token_ids.len()
            )));
        }

        let mask_logits = logits.get(0)?.get(mask_pos)?; // [vocab_size]
        mask_probabilities(&mask_logits)
    }

    /// Log the most likely filler at debug level.
    fn trace_top_prediction(&self, sentence: &str, probs: &[f32]) {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return;
        }
        let top = probs
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((idx, prob)) = top {
            #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
            let token = self
                .tokenizer
                .decode(&[idx as u32])
                .unwrap_or_else(|_| format!("#{idx}"));
            tracing::debug!(sentence, top = %token.trim(), probability = prob, "top prediction");
        }
    }
}

impl FillMask for FillMaskModel {
    fn candidate_probabilities(
        &self,
        sentence: &str,
        candidates: &[&str],
    ) -> Result<CandidateProbabilities> {
        let probs = self.mask_distribution(sentence)?;
        self.trace_top_prediction(sentence, &probs);

        let mut result = CandidateProbabilities::new();
        for &candidate in candidates {
            let Some(id) = self.tokenizer.candidate_id(candidate)? else {
                tracing::warn!(candidate, "candidate has no vocabulary id; skipping");
                continue;
            };
            let prob = usize::try_from(id)
                .ok()
                .and_then(|idx| probs.get(idx))
                .ok_or_else(|| {
                    BiasError::Inference(format!(
                        "candidate '{candidate}' id {id} is outside the model vocabulary ({})",
                        probs.len()
                    ))
                })?;
            result.push(candidate, f64::from(*prob));
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Backend dispatch
// ---------------------------------------------------------------------------

/// Build the encoder matching `config.family` from a [`VarBuilder`] at the
/// checkpoint root.
///
/// # Errors
///
/// Returns [`BiasError::Model`] if a tensor is missing or has the wrong
/// shape.
// TRAIT_OBJECT: heterogeneous encoder backends require dynamic dispatch
pub fn load_backend(config: BertConfig, vb: VarBuilder<'_>) -> Result<Box<dyn MaskedLmBackend>> {
    match config.family {
        EncoderFamily::Bert => Ok(Box::new(BertMaskedLm::load(config, vb)?)),
        EncoderFamily::DistilBert => Ok(Box::new(DistilBertMaskedLm::load(config, vb)?)),
    }
}

/// Reject a tokenizer that can emit ids the model has no logits for.
fn check_vocab(tokenizer: &MlmTokenizer, backend: &dyn MaskedLmBackend) -> Result<()> {
    if tokenizer.vocab_size() > backend.vocab_size() {
        return Err(BiasError::Config(format!(
            "tokenizer vocabulary ({}) is larger than the model's ({})",
            tokenizer.vocab_size(),
            backend.vocab_size()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Weight loading helpers (used by from_pretrained)
// ---------------------------------------------------------------------------

/// Create a `VarBuilder` from safetensors file paths.
///
/// Uses buffered (safe) loading by default. With the `mmap` feature,
/// uses memory-mapped loading for reduced memory overhead on large models.
fn create_var_builder(
    paths: &[std::path::PathBuf],
    dtype: DType,
    device: &Device,
) -> Result<VarBuilder<'static>> {
    #[cfg(feature = "mmap")]
    {
        mmap_var_builder(paths, dtype, device)
    }
    #[cfg(not(feature = "mmap"))]
    {
        buffered_var_builder(paths, dtype, device)
    }
}

/// Load weights via buffered (safe) reading: all data is read into RAM.
///
/// Only supports single-file models. For sharded models, enable
/// the `mmap` feature.
#[cfg(not(feature = "mmap"))]
fn buffered_var_builder(
    paths: &[std::path::PathBuf],
    dtype: DType,
    device: &Device,
) -> Result<VarBuilder<'static>> {
    if paths.len() > 1 {
        return Err(BiasError::Config(
            "sharded models require the `mmap` feature: \
             bias-radar = { features = [\"mmap\"] }"
                .into(),
        ));
    }
    let path = paths
        .first()
        .ok_or_else(|| BiasError::Config("no safetensors files".into()))?;
    let data = std::fs::read(path).map_err(|e| {
        BiasError::ModelLoad(format!("read {}: {e}", path.display()))
    })?;
    let vb = VarBuilder::from_buffered_safetensors(data, dtype, device)?;
    Ok(vb)
}

/// Load weights via memory-mapped files, with minimal RAM overhead for large models.
///
/// # Safety
///
/// The safetensors files must not be modified while the model is loaded.
/// This is the standard invariant for memory-mapped files.
#[cfg(feature = "mmap")]
#[allow(unsafe_code)]
fn mmap_var_builder(
    paths: &[std::path::PathBuf],
    dtype: DType,
    device: &Device,
) -> Result<VarBuilder<'static>> {
    // SAFETY: safetensors files must not be modified while loaded.
    let vb = unsafe { VarBuilder::from_mmaped_safetensors(paths, dtype, device)? };
    Ok(vb)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
