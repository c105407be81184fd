use std::ops::Range;

use ndarray::{Array2, Axis, Zip};

use crate::error::{LdaError, Result};

/// Shared aggregate state of the sampler: the sufficient-statistic count
/// matrices, the cached topic normalizers, and the Dirichlet priors.
///
/// `word_top[w, k]` counts tokens of word `w` currently assigned topic `k`;
/// `top_doc[d, k]` counts tokens of document `d` assigned topic `k` (document
/// rows are contiguous so one worker's partition is a contiguous row block).
/// `inv_top_sums[k]` caches `1 / (Σ_w word_top[w,k] + Σ_w beta[w])` and is
/// recomputed once per iteration, during the merge phase — within a sweep it
/// is deliberately stale.
#[derive(Debug, Clone)]
pub struct CountStore {
    /// V x K word-topic counts
    pub word_top: Array2<u32>,
    /// D x K document-topic counts
    pub top_doc: Array2<u32>,
    /// len K cached reciprocal normalizers
    pub inv_top_sums: Vec<f64>,
    /// len K document-topic prior
    pub alpha: Vec<f64>,
    /// len V topic-word prior
    pub beta: Vec<f64>,
    beta_sum: f64,
}

/// Read-only view of the globally shared matrices, valid for one sweep.
///
/// Workers hold this for the duration of a sweep while the owning store is
/// immutably borrowed; the merge phase is the only writer and runs strictly
/// after every worker has finished.
#[derive(Debug, Clone, Copy)]
pub struct SweepSnapshot<'a> {
    pub word_top: &'a Array2<u32>,
    pub inv_top_sums: &'a [f64],
    pub alpha: &'a [f64],
    pub beta: &'a [f64],
}

impl CountStore {
    /// Create an empty store, validating the configuration before any
    /// allocation happens.
    pub fn new(v: usize, n_docs: usize, k: usize, alpha: Vec<f64>, beta: Vec<f64>) -> Result<Self> {
        if k == 0 {
            return Err(LdaError::Config("K must be positive".to_string()));
        }
        if alpha.len() != k {
            return Err(LdaError::ShapeMismatch {
                what: "alpha",
                got: alpha.len(),
                expected: k,
            });
        }
        if beta.len() != v {
            return Err(LdaError::ShapeMismatch {
                what: "beta",
                got: beta.len(),
                expected: v,
            });
        }
        if alpha.iter().chain(beta.iter()).any(|&x| !(x > 0.0)) {
            return Err(LdaError::Config(
                "alpha and beta must be strictly positive".to_string(),
            ));
        }
        let beta_sum: f64 = beta.iter().sum();
        let mut store = Self {
            word_top: Array2::zeros((v, k)),
            top_doc: Array2::zeros((n_docs, k)),
            inv_top_sums: vec![0.0; k],
            alpha,
            beta,
            beta_sum,
        };
        store.recompute_inv_top_sums();
        Ok(store)
    }

    /// Number of topics K.
    pub fn k(&self) -> usize {
        self.alpha.len()
    }

    /// Vocabulary size V.
    pub fn v(&self) -> usize {
        self.beta.len()
    }

    /// Number of documents D.
    pub fn n_docs(&self) -> usize {
        self.top_doc.nrows()
    }

    /// Σ_w beta[w], the smoothing mass in every topic normalizer.
    pub fn beta_sum(&self) -> f64 {
        self.beta_sum
    }

    /// Borrow the shared matrices for one sweep.
    pub fn snapshot(&self) -> SweepSnapshot<'_> {
        SweepSnapshot {
            word_top: &self.word_top,
            inv_top_sums: &self.inv_top_sums,
            alpha: &self.alpha,
            beta: &self.beta,
        }
    }

    /// Rebuild both count matrices from a full assignment vector.
    pub(crate) fn aggregate(&mut self, tokens: &[u32], spans: &[Range<usize>], z: &[u32]) {
        self.word_top.fill(0);
        self.top_doc.fill(0);
        for (d, span) in spans.iter().enumerate() {
            for i in span.clone() {
                let w = tokens[i] as usize;
                let k = z[i] as usize;
                self.word_top[[w, k]] += 1;
                self.top_doc[[d, k]] += 1;
            }
        }
        self.recompute_inv_top_sums();
    }

    /// Add one worker's local word-topic delta into the shared matrix.
    /// Deltas are sums of ±1 moves of counted tokens, so the result never
    /// goes negative.
    pub(crate) fn apply_delta(&mut self, delta: &Array2<i32>) {
        Zip::from(&mut self.word_top)
            .and(delta)
            .for_each(|c, &d| *c = (*c as i64 + d as i64) as u32);
    }

    pub(crate) fn recompute_inv_top_sums(&mut self) {
        let sums = self.word_top.fold_axis(Axis(0), 0u64, |&acc, &c| acc + c as u64);
        for (inv, &sum) in self.inv_top_sums.iter_mut().zip(sums.iter()) {
            *inv = 1.0 / (sum as f64 + self.beta_sum);
        }
    }

    /// Check the iteration-boundary invariants: counts are exactly the
    /// aggregation of `z` over the token stream and document spans.
    pub fn check_consistency(&self, tokens: &[u32], spans: &[Range<usize>], z: &[u32]) -> Result<()> {
        for (d, span) in spans.iter().enumerate() {
            let row_sum: u64 = self.top_doc.row(d).iter().map(|&c| c as u64).sum();
            if row_sum != span.len() as u64 {
                return Err(LdaError::ShapeMismatch {
                    what: "top_doc row sum",
                    got: row_sum as usize,
                    expected: span.len(),
                });
            }
        }
        let mut occurrences = vec![0u64; self.v()];
        for &w in tokens {
            occurrences[w as usize] += 1;
        }
        for (w, &expected) in occurrences.iter().enumerate() {
            let row_sum: u64 = self.word_top.row(w).iter().map(|&c| c as u64).sum();
            if row_sum != expected {
                return Err(LdaError::ShapeMismatch {
                    what: "word_top row sum",
                    got: row_sum as usize,
                    expected: expected as usize,
                });
            }
        }
        let mut expected = self.clone();
        expected.aggregate(tokens, spans, z);
        if expected.word_top != self.word_top || expected.top_doc != self.top_doc {
            return Err(LdaError::Config(
                "counts do not aggregate the current assignment".to_string(),
            ));
        }
        Ok(())
    }
}
