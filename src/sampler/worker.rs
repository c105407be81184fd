use std::ops::Range;

use ndarray::Array2;
use rand_chacha::ChaCha8Rng;

use crate::error::Result;
use crate::sampler::counts::SweepSnapshot;
use crate::sampler::kernel;

/// Split `n_docs` documents into at most `n_workers` contiguous, disjoint
/// blocks covering the whole range, sizes differing by at most one. The
/// leading blocks take the remainder.
pub(crate) fn partition_docs(n_docs: usize, n_workers: usize) -> Vec<Range<usize>> {
    let blocks = n_docs.min(n_workers);
    if blocks == 0 {
        return Vec::new();
    }
    let (q, r) = (n_docs / blocks, n_docs % blocks);
    let mut out = Vec::with_capacity(blocks);
    let mut start = 0;
    for b in 0..blocks {
        let len = q + usize::from(b < r);
        out.push(start..start + len);
        start += len;
    }
    out
}

/// One worker's share of a sweep.
///
/// The task owns copies of its partition's `top_doc` rows and `Z` slice and
/// accumulates its word-topic moves in a local delta; the shared matrices are
/// only ever read, through the sweep snapshot. Nothing global is written
/// until every task has returned, so an aborted sweep leaves the model at
/// its last fully-merged state.
pub(crate) struct SweepTask<'a> {
    /// document ids this worker owns
    pub docs: Range<usize>,
    /// token range covered by those documents
    pub token_range: Range<usize>,
    /// absolute token spans, one per owned document
    pub spans: &'a [Range<usize>],
    /// the full immutable token stream
    pub tokens: &'a [u32],
    /// owned copy of Z over `token_range`
    pub z: Vec<u32>,
    /// owned copy of the partition's top_doc rows, docs.len() x K
    pub top_doc: Array2<u32>,
    pub rng: ChaCha8Rng,
}

/// What a worker hands back for the merge phase.
pub(crate) struct SweepOutcome {
    pub docs: Range<usize>,
    pub token_range: Range<usize>,
    pub z: Vec<u32>,
    pub top_doc: Array2<u32>,
    /// V x K local word-topic delta
    pub delta: Array2<i32>,
}

impl SweepTask<'_> {
    /// Resample every token in this partition once, in document order.
    pub fn run(mut self, snap: &SweepSnapshot<'_>) -> Result<SweepOutcome> {
        let k = self.top_doc.ncols();
        let v = snap.word_top.nrows();
        let mut delta = Array2::<i32>::zeros((v, k));
        let mut cum = vec![0.0; k];

        for (local_d, span) in self.spans.iter().enumerate() {
            for i in span.clone() {
                let w = self.tokens[i] as usize;
                let zi = i - self.token_range.start;
                let z_new = kernel::resample_token(
                    self.z[zi] as usize,
                    self.top_doc.row_mut(local_d),
                    snap.word_top.row(w),
                    delta.row_mut(w),
                    snap.alpha,
                    snap.beta[w],
                    snap.inv_top_sums,
                    &mut cum,
                    &mut self.rng,
                )?;
                self.z[zi] = z_new as u32;
            }
        }

        Ok(SweepOutcome {
            docs: self.docs,
            token_range: self.token_range,
            z: self.z,
            top_doc: self.top_doc,
            delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::counts::CountStore;
    use crate::sampler::rng::SeedKey;

    #[test]
    fn partition_covers_contiguously() {
        for (n_docs, n_workers) in [(10, 3), (3, 10), (7, 7), (100, 8), (1, 1)] {
            let parts = partition_docs(n_docs, n_workers);
            assert_eq!(parts.len(), n_docs.min(n_workers));
            let mut next = 0;
            for p in &parts {
                assert_eq!(p.start, next, "gap or overlap at {p:?}");
                next = p.end;
            }
            assert_eq!(next, n_docs);
            let min = parts.iter().map(|p| p.len()).min().unwrap();
            let max = parts.iter().map(|p| p.len()).max().unwrap();
            assert!(max - min <= 1, "uneven split: {parts:?}");
        }
    }

    #[test]
    fn partition_of_nothing_is_empty() {
        assert!(partition_docs(0, 4).is_empty());
    }

    #[test]
    fn sweep_preserves_document_masses() {
        // 2 docs, 3 words, 2 topics; worker owns both docs
        let tokens = vec![0u32, 1, 2, 0, 1, 2];
        let spans = vec![0..3, 3..6];
        let z = vec![0u32, 0, 1, 1, 0, 1];
        let mut store = CountStore::new(3, 2, 2, vec![0.1; 2], vec![0.01; 3]).unwrap();
        store.aggregate(&tokens, &spans, &z);

        let task = SweepTask {
            docs: 0..2,
            token_range: 0..6,
            spans: &spans,
            tokens: &tokens,
            z: z.clone(),
            top_doc: store.top_doc.clone(),
            rng: SeedKey::new(11).rng(),
        };
        let outcome = task.run(&store.snapshot()).unwrap();

        assert_eq!(outcome.z.len(), 6);
        assert!(outcome.z.iter().all(|&t| t < 2));
        for (d, span) in spans.iter().enumerate() {
            let sum: u32 = outcome.top_doc.row(d).iter().sum();
            assert_eq!(sum as usize, span.len());
        }
        // delta sums to zero: every move is decrement + increment
        assert_eq!(outcome.delta.iter().sum::<i32>(), 0);
        // per-word delta rows also conserve mass
        for w in 0..3 {
            assert_eq!(outcome.delta.row(w).iter().sum::<i32>(), 0);
        }
    }

    #[test]
    fn disjoint_tasks_merge_into_consistent_counts() {
        let tokens = vec![0u32, 1, 0, 2, 1, 0, 2, 2];
        let spans = vec![0..2, 2..5, 5..8];
        let z = vec![0u32, 1, 0, 1, 0, 1, 0, 1];
        let mut store = CountStore::new(3, 3, 2, vec![0.1; 2], vec![0.01; 3]).unwrap();
        store.aggregate(&tokens, &spans, &z);

        let parts = partition_docs(3, 2);
        let keys = SeedKey::new(21).split(parts.len());
        let mut merged_z = z.clone();
        let snap = store.snapshot();
        let mut outcomes = Vec::new();
        for (part, key) in parts.iter().zip(keys) {
            let tok_lo = spans[part.start].start;
            let tok_hi = spans[part.end - 1].end;
            let task = SweepTask {
                docs: part.clone(),
                token_range: tok_lo..tok_hi,
                spans: &spans[part.clone()],
                tokens: &tokens,
                z: merged_z[tok_lo..tok_hi].to_vec(),
                top_doc: store.top_doc.slice(ndarray::s![part.clone(), ..]).to_owned(),
                rng: key.rng(),
            };
            outcomes.push(task.run(&snap).unwrap());
        }

        for o in &outcomes {
            merged_z[o.token_range.clone()].copy_from_slice(&o.z);
            store
                .top_doc
                .slice_mut(ndarray::s![o.docs.clone(), ..])
                .assign(&o.top_doc);
        }
        for o in &outcomes {
            store.apply_delta(&o.delta);
        }
        store.recompute_inv_top_sums();

        store.check_consistency(&tokens, &spans, &merged_z).unwrap();
    }
}
