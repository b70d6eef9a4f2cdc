// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tokenizer wrapper for masked-language models.
//!
//! [`MlmTokenizer`] wraps a `HuggingFace` tokenizer and remembers the id
//! of its mask token, which every fill-mask query needs.

use std::str::FromStr;

use crate::error::{BiasError, Result};

/// Mask token used by BERT-family vocabularies.
pub const MASK_TOKEN: &str = "[MASK]";

/// `HuggingFace` tokenizer with a resolved mask token.
///
/// # Example
///
/// ```no_run
/// use bias_radar::MlmTokenizer;
///
/// # fn main() -> bias_radar::Result<()> {
/// let tok = MlmTokenizer::from_hf_path("tokenizer.json")?;
/// let ids = tok.encode("The doctor is [MASK].")?;
/// assert!(ids.contains(&tok.mask_token_id()));
/// # Ok(())
/// # }
/// ```
pub struct MlmTokenizer {
    /// Underlying `tokenizers` instance.
    inner: Box<tokenizers::Tokenizer>,
    /// Vocabulary id of [`MASK_TOKEN`].
    mask_token_id: u32,
}

impl MlmTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Tokenizer`] if the file cannot be loaded or
    /// parsed, or if its vocabulary has no `[MASK]` token.
    pub fn from_hf_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let tok = tokenizers::Tokenizer::from_file(path.as_ref()).map_err(|e| {
            BiasError::Tokenizer(format!(
                "failed to load HF tokenizer from {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_hf(tok)
    }

    /// Parse a tokenizer from the contents of a `tokenizer.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Tokenizer`] if the JSON is not a valid
    /// tokenizer or has no `[MASK]` token.
    pub fn from_json(json: &str) -> Result<Self> {
        let tok = tokenizers::Tokenizer::from_str(json)
            .map_err(|e| BiasError::Tokenizer(format!("failed to parse tokenizer JSON: {e}")))?;
        Self::from_hf(tok)
    }

    /// Wrap an already-loaded `HuggingFace` tokenizer.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Tokenizer`] if the vocabulary has no `[MASK]` token.
    pub fn from_hf(tokenizer: tokenizers::Tokenizer) -> Result<Self> {
        let mask_token_id = tokenizer.token_to_id(MASK_TOKEN).ok_or_else(|| {
            BiasError::Tokenizer(format!(
                "tokenizer has no {MASK_TOKEN} token; a fill-mask model is required"
            ))
        })?;
        Ok(Self {
            inner: Box::new(tokenizer),
            mask_token_id,
        })
    }

    /// Vocabulary id of the mask token.
    #[must_use]
    pub const fn mask_token_id(&self) -> u32 {
        self.mask_token_id
    }

    /// Encode text into token ids, adding special tokens (`[CLS]`, `[SEP]`).
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Tokenizer`] if encoding fails.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| BiasError::Tokenizer(format!("HF encode failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Encode text into token ids **without** adding special tokens.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Tokenizer`] if encoding fails.
    pub fn encode_raw(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| BiasError::Tokenizer(format!("HF encode failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Resolve the vocabulary id used to score a fill-in candidate.
    ///
    /// Uses the exact vocabulary entry when one exists, otherwise the first
    /// sub-token of the candidate's raw encoding. Returns `None` when the
    /// candidate encodes to nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Tokenizer`] if encoding fails.
    pub fn candidate_id(&self, candidate: &str) -> Result<Option<u32>> {
        if let Some(id) = self.inner.token_to_id(candidate) {
            return Ok(Some(id));
        }
        let ids = self.encode_raw(candidate)?;
        if ids.len() > 1 {
            tracing::warn!(
                candidate,
                sub_tokens = ids.len(),
                "candidate is not a single vocabulary token; scoring its first sub-token"
            );
        }
        Ok(ids.first().copied())
    }

    /// Decode token ids back to a string.
    ///
    /// # Errors
    ///
    /// Returns [`BiasError::Tokenizer`] if decoding fails.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, false)
            .map_err(|e| BiasError::Tokenizer(format!("HF decode failed: {e}")))
    }

    /// Get vocabulary size.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl std::fmt::Debug for MlmTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlmTokenizer")
            .field("mask_token_id", &self.mask_token_id)
            .field("vocab_size", &self.vocab_size())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// A word-level `tokenizer.json` with BERT-style special tokens.
    pub(crate) const TINY_TOKENIZER_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": "[PAD]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 1, "content": "[UNK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 2, "content": "[CLS]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 3, "content": "[SEP]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 4, "content": "[MASK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": {"type": "Lowercase"},
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": {
            "type": "TemplateProcessing",
            "single": [
                {"SpecialToken": {"id": "[CLS]", "type_id": 0}},
                {"Sequence": {"id": "A", "type_id": 0}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 0}}
            ],
            "pair": [
                {"SpecialToken": {"id": "[CLS]", "type_id": 0}},
                {"Sequence": {"id": "A", "type_id": 0}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 0}},
                {"Sequence": {"id": "B", "type_id": 1}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 1}}
            ],
            "special_tokens": {
                "[CLS]": {"id": "[CLS]", "ids": [2], "tokens": ["[CLS]"]},
                "[SEP]": {"id": "[SEP]", "ids": [3], "tokens": ["[SEP]"]}
            }
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {
                "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3, "[MASK]": 4,
                "the": 5, "is": 6, ".": 7, "he": 8, "she": 9,
                "doctor": 10, "nurse": 11, "engineer": 12, "teacher": 13,
                "receptionist": 14, "programmer": 15
            },
            "unk_token": "[UNK]"
        }
    }"#;

    #[test]
    fn encodes_cloze_sentence_with_special_tokens() {
        let tok = MlmTokenizer::from_json(TINY_TOKENIZER_JSON).unwrap();
        let ids = tok.encode("The doctor is [MASK].").unwrap();
        assert_eq!(ids, vec![2, 5, 10, 6, 4, 7, 3]);
        assert_eq!(tok.mask_token_id(), 4);
    }

    #[test]
    fn raw_encoding_skips_special_tokens() {
        let tok = MlmTokenizer::from_json(TINY_TOKENIZER_JSON).unwrap();
        assert_eq!(tok.encode_raw("the nurse").unwrap(), vec![5, 11]);
    }

    #[test]
    fn candidate_ids_resolve_from_vocabulary() {
        let tok = MlmTokenizer::from_json(TINY_TOKENIZER_JSON).unwrap();
        assert_eq!(tok.candidate_id("he").unwrap(), Some(8));
        assert_eq!(tok.candidate_id("she").unwrap(), Some(9));
    }

    #[test]
    fn tokenizer_without_mask_is_rejected() {
        let json = TINY_TOKENIZER_JSON
            .replace(r#""content": "[MASK]""#, r#""content": "[MSK]""#)
            .replace(r#""[MASK]": 4"#, r#""[MSK]": 4"#);
        let err = MlmTokenizer::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("[MASK]"));
    }

    #[test]
    fn missing_file_is_a_tokenizer_error() {
        let err = MlmTokenizer::from_hf_path("/nonexistent/tokenizer.json").unwrap_err();
        assert!(matches!(err, BiasError::Tokenizer(_)));
    }
}
