// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for bias-radar.

/// Errors that can occur while loading a model, scanning, or rendering.
#[derive(Debug, thiserror::Error)]
pub enum BiasError {
    /// The model could not be resolved, downloaded, or loaded.
    #[error("model not found or network error: {0}")]
    ModelLoad(String),

    /// A scan was attempted before a model was loaded.
    #[error("model not loaded: call load() first")]
    NotLoaded,

    /// The model's output could not be interpreted as fill-mask probabilities.
    #[error("model not compatible: {0}")]
    Inference(String),

    /// Tensor operation or weight loading error (wraps candle).
    #[error("tensor error: {0}")]
    Model(#[from] candle_core::Error),

    /// Model configuration parsing error.
    #[error("config error: {0}")]
    Config(String),

    /// Tokenizer error.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Chart drawing or PNG encoding error.
    #[error("render error: {0}")]
    Render(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BiasError {
    /// Re-tag a lower-level failure as a [`BiasError::ModelLoad`] for `model_id`.
    ///
    /// Errors that already are `ModelLoad` pass through unchanged.
    #[must_use]
    pub fn into_model_load(self, model_id: &str) -> Self {
        match self {
            Self::ModelLoad(_) => self,
            other => Self::ModelLoad(format!("{model_id}: {other}")),
        }
    }

    /// Re-tag a lower-level failure as a [`BiasError::Inference`].
    ///
    /// `NotLoaded` and `Inference` pass through unchanged.
    #[must_use]
    pub fn into_inference(self) -> Self {
        match self {
            Self::NotLoaded | Self::Inference(_) => self,
            other => Self::Inference(other.to_string()),
        }
    }
}

/// Result type alias for bias-radar operations.
pub type Result<T> = std::result::Result<T, BiasError>;
