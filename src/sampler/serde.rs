//! Archive (de)serialization for [`LdaSampler`].
//!
//! The archive is a single self-describing CBOR map of named arrays. Every
//! field of the shared count store, the hyperparameters, the corpus reference
//! data, and — only if the model ever tracked it — the likelihood history.
//!
//! シリアライズは`LdaArchive`を経由します。`LdaSampler`は`Arc`参照を
//! 含んでいるため、参照を解いたアーカイブ構造に変換してから書き出します。

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::error::{LdaError, Result};
use crate::sampler::counts::CountStore;
use crate::sampler::LdaSampler;

/// Named-array archive of a full sampler state.
///
/// Field names follow the persisted layout (`K` and `Z` keep their
/// conventional upper-case names on the wire). `log_probs` is written only
/// when the model tracked likelihood; a model that never tracked it loads
/// back with the history still absent, not empty.
///
/// `context_data` carries the document end-offsets of the trained context
/// type so a loaded model can keep training. Only the trained context type
/// is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdaArchive {
    pub corpus: Vec<u32>,
    pub vocabulary: Vec<Box<str>>,
    pub context_type: Box<str>,
    pub context_data: Vec<usize>,
    #[serde(rename = "K")]
    pub k: u32,
    pub alpha: Vec<f64>,
    pub beta: Vec<f64>,
    #[serde(rename = "Z")]
    pub z: Vec<u32>,
    pub word_top: Array2<u32>,
    pub top_doc: Array2<u32>,
    pub inv_top_sums: Vec<f64>,
    pub iteration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_probs: Option<Vec<(u32, f64)>>,
}

impl LdaArchive {
    /// Snapshot a sampler into its archive form.
    pub fn from_sampler(m: &LdaSampler) -> Self {
        LdaArchive {
            corpus: m.corpus_ref.tokens().to_vec(),
            vocabulary: m.corpus_ref.vocabulary().map(Box::from).collect(),
            context_type: m.context_type.clone(),
            context_data: m.spans.iter().map(|s| s.end).collect(),
            k: m.k() as u32,
            alpha: m.counts.alpha.clone(),
            beta: m.counts.beta.clone(),
            z: m.z.clone(),
            word_top: m.counts.word_top.clone(),
            top_doc: m.counts.top_doc.clone(),
            inv_top_sums: m.counts.inv_top_sums.clone(),
            iteration: m.iteration,
            log_probs: m.log_probs.clone(),
        }
    }

    /// Reconstruct a live sampler, validating every shape and value range
    /// first. No model state exists until validation has passed; the restored
    /// fields are bit-exact, including the cached normalizers.
    pub fn into_sampler(self) -> Result<LdaSampler> {
        let k = self.k as usize;
        let v = self.vocabulary.len();
        let d = self.context_data.len();
        let n = self.corpus.len();

        if k == 0 {
            return Err(LdaError::ArchiveFormat("K must be positive".to_string()));
        }
        check_dim("word_top rows", self.word_top.nrows(), v)?;
        check_dim("word_top cols", self.word_top.ncols(), k)?;
        check_dim("top_doc rows", self.top_doc.nrows(), d)?;
        check_dim("top_doc cols", self.top_doc.ncols(), k)?;
        check_dim("inv_top_sums", self.inv_top_sums.len(), k)?;
        check_dim("Z", self.z.len(), n)?;
        if let Some(&bad) = self.z.iter().find(|&&t| t as usize >= k) {
            return Err(LdaError::ArchiveFormat(format!(
                "assignment {bad} out of range for K = {k}"
            )));
        }

        let vocab: IndexSet<Box<str>> = self.vocabulary.iter().cloned().collect();
        if vocab.len() != self.vocabulary.len() {
            return Err(LdaError::ArchiveFormat(
                "duplicate vocabulary entry".to_string(),
            ));
        }
        let mut contexts = IndexMap::new();
        contexts.insert(self.context_type.clone(), self.context_data);
        let corpus = Corpus::new(self.corpus, vocab, contexts)
            .map_err(|e| LdaError::ArchiveFormat(e.to_string()))?;
        let spans = corpus.context_spans(&self.context_type)?;

        // prior validation (K > 0, lengths, positivity) happens here
        let mut counts = CountStore::new(v, d, k, self.alpha, self.beta)?;
        counts.word_top = self.word_top;
        counts.top_doc = self.top_doc;
        counts.inv_top_sums = self.inv_top_sums;

        Ok(LdaSampler {
            corpus_ref: Arc::new(corpus),
            context_type: self.context_type,
            spans,
            counts,
            z: self.z,
            iteration: self.iteration,
            log_probs: self.log_probs,
            n_workers: rayon::current_num_threads(),
        })
    }
}

fn check_dim(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(LdaError::ShapeMismatch {
            what,
            got,
            expected,
        });
    }
    Ok(())
}

impl LdaSampler {
    /// Write the full model state to a CBOR archive at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_cbor::to_writer(BufWriter::new(file), &LdaArchive::from_sampler(self))?;
        Ok(())
    }

    /// Load a model from an archive written by [`save`](Self::save).
    ///
    /// The worker count is runtime configuration, not model state; a loaded
    /// model defaults to one worker per rayon thread.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let archive: LdaArchive = serde_cbor::from_reader(BufReader::new(file))?;
        archive.into_sampler()
    }
}
