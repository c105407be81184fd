pub mod counts;
pub(crate) mod kernel;
pub mod rng;
pub mod serde;
pub mod trainer;
pub(crate) mod worker;

use std::ops::Range;
use std::sync::Arc;

use ndarray::Array2;
use rand::Rng;

use crate::corpus::Corpus;
use crate::error::{LdaError, Result};
use crate::sampler::counts::CountStore;
use crate::sampler::rng::SeedKey;

/// Symmetric Dirichlet prior used when none is supplied.
pub const DEFAULT_PRIOR: f64 = 0.01;

/// Construction-time options for [`LdaSampler`].
///
/// `None` fields fall back to the defaults: symmetric `DEFAULT_PRIOR` priors
/// and one worker per rayon thread. `seed` drives the initial topic draw so
/// freshly constructed models are reproducible; two models built with the
/// same corpus, options, and seed start from identical assignments.
#[derive(Debug, Clone, Default)]
pub struct SamplerOptions {
    /// document-topic prior, len K
    pub alpha: Option<Vec<f64>>,
    /// topic-word prior, len V
    pub beta: Option<Vec<f64>>,
    /// worker count for sweeps
    pub n_workers: Option<usize>,
    /// seed for the initial assignment draw
    pub seed: u64,
}

/// LDA topic model trained by parallel collapsed Gibbs sampling.
///
/// Owns the shared count store, the per-token topic assignment `Z`, and a
/// reference to the corpus it was built from. Construction draws a random
/// assignment and aggregates the counts (the `Initialized` state);
/// [`train`](Self::train) advances the model sweep by sweep and may be called
/// repeatedly, including after a [`load`](Self::load).
#[derive(Debug)]
pub struct LdaSampler {
    corpus_ref: Arc<Corpus>,
    context_type: Box<str>,
    /// token spans of the trained context type, one per document
    spans: Vec<Range<usize>>,
    counts: CountStore,
    z: Vec<u32>,
    iteration: u32,
    /// populated the first time a train call tracks likelihood; absent
    /// otherwise, including across save/load
    log_probs: Option<Vec<(u32, f64)>>,
    n_workers: usize,
}

impl LdaSampler {
    /// Create a model with default priors and worker count.
    pub fn new(corpus_ref: Arc<Corpus>, context_type: &str, k: usize) -> Result<Self> {
        Self::with_options(corpus_ref, context_type, k, SamplerOptions::default())
    }

    /// Create a model in the `Initialized` state: configuration validated,
    /// every token assigned a uniformly random topic, counts aggregated,
    /// iteration 0.
    pub fn with_options(
        corpus_ref: Arc<Corpus>,
        context_type: &str,
        k: usize,
        opts: SamplerOptions,
    ) -> Result<Self> {
        let spans = corpus_ref.context_spans(context_type)?;
        let v = corpus_ref.vocab_size();
        let alpha = opts.alpha.unwrap_or_else(|| vec![DEFAULT_PRIOR; k]);
        let beta = opts.beta.unwrap_or_else(|| vec![DEFAULT_PRIOR; v]);
        // validates K and prior shapes before any counting happens
        let mut counts = CountStore::new(v, spans.len(), k, alpha, beta)?;

        let n_workers = opts
            .n_workers
            .unwrap_or_else(rayon::current_num_threads)
            .max(1);

        let mut rng = SeedKey::new(opts.seed).rng();
        let z: Vec<u32> = (0..corpus_ref.len())
            .map(|_| rng.random_range(0..k as u32))
            .collect();
        counts.aggregate(corpus_ref.tokens(), &spans, &z);

        Ok(Self {
            corpus_ref,
            context_type: Box::from(context_type),
            spans,
            counts,
            z,
            iteration: 0,
            log_probs: None,
            n_workers,
        })
    }

    /// Number of topics K.
    pub fn k(&self) -> usize {
        self.counts.k()
    }

    /// Vocabulary size V.
    pub fn vocab_size(&self) -> usize {
        self.counts.v()
    }

    /// Number of documents under the trained context type.
    pub fn n_docs(&self) -> usize {
        self.spans.len()
    }

    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    /// Completed sweep count.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn context_type(&self) -> &str {
        &self.context_type
    }

    /// The corpus this model was built from.
    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus_ref
    }

    /// Per-token topic assignment, index-aligned with the token stream.
    pub fn z(&self) -> &[u32] {
        &self.z
    }

    /// V x K word-topic counts.
    pub fn word_top(&self) -> &Array2<u32> {
        &self.counts.word_top
    }

    /// D x K document-topic counts.
    pub fn top_doc(&self) -> &Array2<u32> {
        &self.counts.top_doc
    }

    /// Cached reciprocal topic normalizers, len K.
    pub fn inv_top_sums(&self) -> &[f64] {
        &self.counts.inv_top_sums
    }

    pub fn alpha(&self) -> &[f64] {
        &self.counts.alpha
    }

    pub fn beta(&self) -> &[f64] {
        &self.counts.beta
    }

    /// The full count store.
    pub fn counts(&self) -> &CountStore {
        &self.counts
    }

    /// `(iteration, log-likelihood)` history; `None` unless a train call ever
    /// tracked likelihood.
    pub fn log_probs(&self) -> Option<&[(u32, f64)]> {
        self.log_probs.as_deref()
    }

    /// Verify the iteration-boundary count invariants.
    pub fn check_invariants(&self) -> Result<()> {
        if let Some(&bad) = self.z.iter().find(|&&t| t as usize >= self.k()) {
            return Err(LdaError::Config(format!(
                "assignment {bad} out of range for K = {}",
                self.k()
            )));
        }
        self.counts
            .check_consistency(self.corpus_ref.tokens(), &self.spans, &self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Arc<Corpus> {
        Arc::new(Corpus::random(120, 12, 4, 99).unwrap())
    }

    #[test]
    fn construction_initializes_counts() {
        let m = LdaSampler::new(corpus(), "document", 5).unwrap();
        assert_eq!(m.iteration(), 0);
        assert_eq!(m.k(), 5);
        assert_eq!(m.vocab_size(), 12);
        assert_eq!(m.n_docs(), 4);
        assert_eq!(m.z().len(), 120);
        assert_eq!(m.word_top().dim(), (12, 5));
        assert_eq!(m.top_doc().dim(), (4, 5));
        assert!(m.log_probs().is_none());
        m.check_invariants().unwrap();
    }

    #[test]
    fn zero_k_is_rejected_before_counting() {
        let err = LdaSampler::new(corpus(), "document", 0).unwrap_err();
        assert!(matches!(err, LdaError::Config(_)));
    }

    #[test]
    fn mismatched_priors_are_rejected() {
        let opts = SamplerOptions {
            alpha: Some(vec![0.1; 3]),
            ..Default::default()
        };
        let err = LdaSampler::with_options(corpus(), "document", 5, opts).unwrap_err();
        assert!(matches!(err, LdaError::ShapeMismatch { what: "alpha", .. }));

        let opts = SamplerOptions {
            beta: Some(vec![0.1; 3]),
            ..Default::default()
        };
        let err = LdaSampler::with_options(corpus(), "document", 5, opts).unwrap_err();
        assert!(matches!(err, LdaError::ShapeMismatch { what: "beta", .. }));
    }

    #[test]
    fn unknown_context_type_is_rejected() {
        let err = LdaSampler::new(corpus(), "sentence", 5).unwrap_err();
        assert!(matches!(err, LdaError::UnknownContextType(_)));
    }

    #[test]
    fn same_seed_same_initial_assignment() {
        let c = corpus();
        let a = LdaSampler::new(Arc::clone(&c), "document", 5).unwrap();
        let b = LdaSampler::new(Arc::clone(&c), "document", 5).unwrap();
        assert_eq!(a.z(), b.z());

        let opts = SamplerOptions {
            seed: 1,
            ..Default::default()
        };
        let d = LdaSampler::with_options(c, "document", 5, opts).unwrap();
        assert_ne!(a.z(), d.z());
    }
}
