// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fill-mask query interface and its typed result.
//!
//! [`FillMask`] is the seam between the scanner and whatever produces
//! masked-token probabilities. Implementations return
//! [`CandidateProbabilities`]: one entry per requested candidate that the
//! model could score, in request order.

use candle_core::{DType, Tensor};

use crate::error::{BiasError, Result};

/// Probability assigned to one candidate filling the mask.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenProbability {
    /// Candidate token text, as requested.
    pub token: String,
    /// Probability (0.0 to 1.0) from the softmax over the full vocabulary.
    pub probability: f64,
}

/// Candidate token → probability, in the order the candidates were requested.
///
/// # Example
///
/// ```
/// use bias_radar::CandidateProbabilities;
///
/// let probs = CandidateProbabilities::from_pairs([("he", 0.6), ("she", 0.1)]);
/// assert_eq!(probs.get("he"), Some(0.6));
/// assert_eq!(probs.get("they"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateProbabilities {
    /// Scored candidates.
    entries: Vec<TokenProbability>,
}

impl CandidateProbabilities {
    /// Create an empty result.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from `(token, probability)` pairs.
    #[must_use]
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(token, probability)| TokenProbability {
                    token: token.into(),
                    probability,
                })
                .collect(),
        }
    }

    /// Add a scored candidate.
    pub fn push(&mut self, token: impl Into<String>, probability: f64) {
        self.entries.push(TokenProbability {
            token: token.into(),
            probability,
        });
    }

    /// Probability of `token`, or `None` if the model did not score it.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.token == token)
            .map(|e| e.probability)
    }

    /// Iterate over scored candidates in request order.
    pub fn iter(&self) -> impl Iterator<Item = &TokenProbability> {
        self.entries.iter()
    }

    /// Number of scored candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no candidate was scored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Anything that can score candidate tokens for a sentence with one mask.
pub trait FillMask {
    /// Score each of `candidates` as the filler of the mask in `sentence`.
    ///
    /// Candidates the model cannot represent are omitted from the result
    /// rather than reported as errors.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Inference`] if the sentence has no mask or the
    /// model output has an unexpected shape, and lower-level tensor or
    /// tokenizer errors otherwise.
    fn candidate_probabilities(
        &self,
        sentence: &str,
        candidates: &[&str],
    ) -> Result<CandidateProbabilities>;
}

/// Softmax over a single position's logits.
///
/// # Shapes
/// - `logits`: `[vocab_size]`
/// - returns: `vocab_size` probabilities
///
/// # Errors
///
/// Returns [`BiasError::Inference`] if `logits` is not 1-D, and
/// [`BiasError::Model`] on tensor failures.
pub fn mask_probabilities(logits: &Tensor) -> Result<Vec<f32>> {
    if logits.rank() != 1 {
        return Err(BiasError::Inference(format!(
            "expected 1-D logits at the mask position, got shape {:?}",
            logits.dims()
        )));
    }
    // PROMOTE: softmax over F16/BF16 can produce NaN; compute in F32
    let logits_f32 = logits.to_dtype(DType::F32)?;
    let probs = candle_nn::ops::softmax_last_dim(&logits_f32.unsqueeze(0)?)?;
    Ok(probs.squeeze(0)?.to_vec1()?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
