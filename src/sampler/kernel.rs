use ndarray::{ArrayView1, ArrayViewMut1};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::error::{LdaError, Result};

/// One collapsed-Gibbs resampling step for a single token.
///
/// Removes the token's current assignment from the document row and the
/// worker-local word delta, forms the conditional
///
/// `p_k ∝ (top_doc[d,k] + alpha[k]) · (word_top[w,k] + delta[w,k] + beta[w]) · inv_top_sums[k]`
///
/// over all K topics, and draws the new topic by cumulative-sum inversion of
/// a uniform draw over the total mass. The global `word_top` row is the
/// sweep snapshot; only the local delta sees this worker's in-sweep moves.
///
/// `cum` is caller-provided scratch of length K, reused across tokens.
#[inline(always)]
pub(crate) fn resample_token(
    z_old: usize,
    mut doc_top: ArrayViewMut1<'_, u32>,
    word_row: ArrayView1<'_, u32>,
    mut delta_row: ArrayViewMut1<'_, i32>,
    alpha: &[f64],
    beta_w: f64,
    inv_top_sums: &[f64],
    cum: &mut [f64],
    rng: &mut ChaCha8Rng,
) -> Result<usize> {
    doc_top[z_old] -= 1;
    delta_row[z_old] -= 1;

    let mut total = 0.0;
    for k in 0..cum.len() {
        let n_dk = doc_top[k] as f64 + alpha[k];
        let n_wk = word_row[k] as f64 + delta_row[k] as f64 + beta_w;
        total += n_dk * n_wk * inv_top_sums[k];
        cum[k] = total;
    }
    // 正の事前分布なのでここは通らないはず
    if !total.is_finite() || total <= 0.0 {
        return Err(LdaError::Numerical(format!(
            "degenerate sampling conditional (total mass {total})"
        )));
    }

    let u = rng.random::<f64>() * total;
    let z_new = cum.iter().position(|&c| u < c).unwrap_or(cum.len() - 1);

    doc_top[z_new] += 1;
    delta_row[z_new] += 1;
    Ok(z_new)
}
