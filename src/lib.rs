// SPDX-License-Identifier: MIT OR Apache-2.0

//! # bias-radar
//!
//! Scan masked language models for gender bias, built on
//! [candle](https://github.com/huggingface/candle).
//!
//! For each of six professions the [`Scanner`] asks a fill-mask model how
//! likely `he` and `she` are to complete `The {profession} is [MASK].`,
//! reduces the pair to a bias score in `[0, 1]`, and the
//! [`BiasVisualizer`] draws the scores as a radar chart.
//!
//! ## Supported models
//!
//! - **BERT** masked-LM checkpoints (`BertForMaskedLM`)
//! - **DistilBERT** masked-LM checkpoints (`DistilBertForMaskedLM`)
//!
//! Weights are read from safetensors, from a local directory or the
//! `HuggingFace` Hub. The backend is chosen from `model_type` in
//! `config.json`.
//!
//! ## Example
//!
//! ```no_run
//! use bias_radar::{BiasVisualizer, Scanner};
//!
//! # fn main() -> bias_radar::Result<()> {
//! let mut scanner = Scanner::new("bert-base-uncased");
//! let results = scanner.scan_all()?;
//! BiasVisualizer::new(&results).render("bias_report.png")?;
//! # Ok(())
//! # }
//! ```

#![deny(warnings)]
#![warn(missing_docs)]

pub mod backend;
pub mod bert;
pub mod cli;
pub mod config;
pub mod distilbert;
pub mod download;
pub mod error;
pub mod fill_mask;
pub mod report;
pub mod scanner;
pub mod tokenizer;
pub mod util;
pub mod visualizer;

pub use backend::{FillMaskModel, MaskedLmBackend, load_backend};
pub use bert::BertMaskedLm;
pub use config::{Activation, BertConfig, EncoderFamily};
pub use distilbert::DistilBertMaskedLm;
pub use error::{BiasError, Result};
pub use fill_mask::{CandidateProbabilities, FillMask, TokenProbability};
pub use scanner::{
    CANDIDATES, DEFAULT_MODEL, EPSILON, PROFESSIONS, ScanResults, Scanner, bias_score,
    cloze_sentence,
};
pub use tokenizer::MlmTokenizer;
pub use visualizer::BiasVisualizer;
