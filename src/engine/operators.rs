//! Genetic operators: point mutation, multi-point crossover and the
//! randomized draws that feed them.

use std::collections::BTreeSet;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::engine::genome::Genome;
use crate::error::{PolyvolveError, Result};

/// Canonical unordered set of mutated loci. `BTreeSet` gives value equality
/// and hashing, which the bad-mutation cache relies on.
pub type MutationSet = BTreeSet<usize>;

/// Flip the base at every position in `positions`, returning a new genome.
/// Flipping the same locus twice cancels out, which is why callers must pass
/// a set rather than a multiset.
pub fn flip_mutate(genome: &Genome, positions: &MutationSet) -> Genome {
    let mut child = genome.clone();
    for &pos in positions {
        child[pos] = 1 - child[pos];
    }
    child
}

/// One Bernoulli trial per locus: each index in `0..length` is included with
/// probability `per_base_rate`. The resulting count follows the binomial
/// distribution with expectation `length * per_base_rate`.
pub fn random_positions<R: Rng>(length: usize, per_base_rate: f64, rng: &mut R) -> MutationSet {
    (0..length)
        .filter(|_| rng.gen::<f64>() <= per_base_rate)
        .collect()
}

/// Per-locus variant of [`random_positions`]: locus `i` is included with
/// probability `rates[i]`. Used by the positional mutation strategy.
pub fn random_weighted_positions<R: Rng>(rates: &[f64], rng: &mut R) -> MutationSet {
    rates
        .iter()
        .enumerate()
        .filter(|(_, &rate)| rng.gen::<f64>() <= rate)
        .map(|(i, _)| i)
        .collect()
}

/// Multi-point crossover: swap alternating segments between two sequences.
///
/// Given ordered cut points, the ranges `[points[0], points[1])`,
/// `[points[2], points[3])`, ... are exchanged; an odd trailing point swaps
/// through the end of the longer sequence. Zero points returns both inputs
/// unchanged. Segments are swapped verbatim, so with different input lengths
/// the outputs may not match their input lengths.
pub fn crossover<T: Clone>(seq1: &[T], seq2: &[T], points: &[usize]) -> (Vec<T>, Vec<T>) {
    let mut ret1 = seq1.to_vec();
    let mut ret2 = seq2.to_vec();
    let end = seq1.len().max(seq2.len());

    for pair in points.chunks(2) {
        let start = pair[0];
        let stop = if pair.len() == 2 { pair[1] } else { end };
        swap_region(&mut ret1, &mut ret2, start, stop);
    }
    (ret1, ret2)
}

/// Exchange `[start, stop)` between two vectors, clamping the range to each
/// vector's length (a range past the end degenerates to an insertion point).
fn swap_region<T: Clone>(a: &mut Vec<T>, b: &mut Vec<T>, start: usize, stop: usize) {
    let (s1, e1) = clamp_range(a.len(), start, stop);
    let (s2, e2) = clamp_range(b.len(), start, stop);

    let seg_b: Vec<T> = b[s2..e2].to_vec();
    let seg_a: Vec<T> = a.splice(s1..e1, seg_b).collect();
    b.splice(s2..e2, seg_a);
}

fn clamp_range(len: usize, start: usize, stop: usize) -> (usize, usize) {
    let s = start.min(len);
    let e = stop.min(len).max(s);
    (s, e)
}

/// Parameters of the two folded-normal draws behind
/// [`random_crossover_points`]: one for the number of cut points, one for
/// their positions (centered on a fraction of the mean sequence length).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossoverParams {
    pub mu: f64,
    pub sigma: f64,
    pub min_events: usize,
    pub pos_mu: f64,
    pub pos_sigma: f64,
}

impl Default for CrossoverParams {
    fn default() -> Self {
        Self {
            mu: 1.0,
            sigma: 0.666,
            min_events: 1,
            pos_mu: 0.5,
            pos_sigma: 0.125,
        }
    }
}

impl CrossoverParams {
    pub fn validate(&self) -> Result<()> {
        if self.sigma <= 0.0 || self.pos_sigma <= 0.0 {
            return Err(PolyvolveError::Configuration(
                "crossover sigma values must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Draw random crossover points for two sequences.
///
/// The number of points is a rounded folded normal clamped to
/// `params.min_events`; each position is a rounded folded normal centered on
/// `pos_mu` times the average sequence length. The returned positions are
/// sorted but not deduplicated: a repeated point is a valid degenerate
/// crossover (a no-op at that locus).
pub fn random_crossover_points<R: Rng>(
    len1: usize,
    len2: usize,
    params: &CrossoverParams,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let count_dist = Normal::new(params.mu, params.sigma)
        .map_err(|e| PolyvolveError::Configuration(format!("invalid crossover count distribution: {e}")))?;
    let n_points = (count_dist.sample(rng).abs().round() as usize).max(params.min_events);

    let span = (len1 + len2) as f64 / 2.0;
    let pos_dist = Normal::new(span * params.pos_mu, span * params.pos_sigma)
        .map_err(|e| PolyvolveError::Configuration(format!("invalid crossover position distribution: {e}")))?;

    let mut points: Vec<usize> = (0..n_points)
        .map(|_| pos_dist.sample(rng).abs().round() as usize)
        .collect();
    points.sort_unstable();
    Ok(points)
}
