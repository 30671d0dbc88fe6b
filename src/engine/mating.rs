//! Cross-island recombination: builds two generations of crossover
//! offspring from the islands' best genomes and picks the best one.

use std::collections::HashMap;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::engine::codec::ShapeCodec;
use crate::engine::genome::Genome;
use crate::engine::operators::{crossover, random_crossover_points, CrossoverParams};
use crate::error::{PolyvolveError, Result};
use crate::eval::{GenomeEvaluator, Individual};

/// A draw of crossover points may legitimately come back empty; give up on a
/// pair after this many consecutive empty draws.
const MAX_EMPTY_DRAWS: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatingConfig {
    /// Cap on the first offspring generation.
    pub f1_size: usize,
    /// Cap on the second generation, bred from the first.
    pub f2_size: usize,
    /// Independent crossover draws per parent pair.
    pub n_crossovers: usize,
    pub crossover: CrossoverParams,
}

impl Default for MatingConfig {
    fn default() -> Self {
        Self {
            f1_size: 64,
            f2_size: 128,
            n_crossovers: 3,
            crossover: CrossoverParams::default(),
        }
    }
}

impl MatingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.f1_size == 0 || self.f2_size == 0 {
            return Err(PolyvolveError::Configuration(
                "offspring generation sizes must be at least 1".to_string(),
            ));
        }
        self.crossover.validate()
    }
}

/// Breed the islands' best genomes and return the best evaluated offspring
/// whose genome differs from every parent, or `None` when no genuine
/// offspring came out (a normal outcome, not an error). The caller decides
/// whether it beats the previous global best.
pub fn mate<E: GenomeEvaluator + ?Sized>(
    codec: &ShapeCodec,
    evaluator: &E,
    parents: &[Genome],
    config: &MatingConfig,
    rng: &mut StdRng,
) -> Result<Option<Individual>> {
    let f1 = offspring_pool(parents, config.f1_size, config, rng)?;
    let f2 = offspring_pool(&f1, config.f2_size, config, rng)?;
    debug!("mating pools: f1={} f2={}", f1.len(), f2.len());

    let mut evaluated = Vec::with_capacity(f1.len() + f2.len());
    for genome in f1.into_iter().chain(f2) {
        evaluated.push(evaluator.evaluate(codec, &genome)?);
    }
    evaluated.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));

    let winner = evaluated
        .into_iter()
        .find(|ind| parents.iter().all(|p| *p != ind.genome));
    if let Some(ind) = &winner {
        info!("best offspring fitness: {}", ind.fitness);
    }
    Ok(winner)
}

/// Recombine every unordered pair of parents, `n_crossovers` times each.
///
/// Pairs are visited in random order so the early-exit size cap does not
/// bias the pool toward low-index parents; generation stops as soon as
/// `max_offspring` children exist (bounding the cost at O(parents²) pair
/// visits rather than exhausting every crossover repetition). Children
/// identical to either parent are discarded, the rest are shuffled and
/// capped.
fn offspring_pool(
    parents: &[Genome],
    max_offspring: usize,
    config: &MatingConfig,
    rng: &mut StdRng,
) -> Result<Vec<Genome>> {
    let mut pairs = Vec::new();
    for a in 0..parents.len() {
        for b in a + 1..parents.len() {
            pairs.push((a, b));
        }
    }
    pairs.shuffle(rng);

    let mut offspring = Vec::new();
    'pairs: for (a, b) in pairs {
        let (parent_a, parent_b) = (&parents[a], &parents[b]);
        for _ in 0..config.n_crossovers {
            let Some(points) = draw_points(parent_a, parent_b, &config.crossover, rng)? else {
                continue;
            };
            let (child_a, child_b) = crossover(parent_a, parent_b, &points);
            for child in [child_a, child_b] {
                if child != *parent_a && child != *parent_b {
                    offspring.push(child);
                }
            }
        }
        if offspring.len() >= max_offspring {
            break 'pairs;
        }
    }

    offspring.shuffle(rng);
    offspring.truncate(max_offspring);
    Ok(offspring)
}

/// Draw crossover points, retrying empty draws: zero points means no
/// recombination at all, which would only clone the parents.
fn draw_points(
    parent_a: &Genome,
    parent_b: &Genome,
    params: &CrossoverParams,
    rng: &mut StdRng,
) -> Result<Option<Vec<usize>>> {
    for _ in 0..MAX_EMPTY_DRAWS {
        let points = random_crossover_points(parent_a.len(), parent_b.len(), params, rng)?;
        if !points.is_empty() {
            return Ok(Some(points));
        }
    }
    Ok(None)
}

/// Deterministically assign offspring to islands, best to worst.
///
/// Both lists are walked in ascending fitness order; an offspring is
/// assigned to the best island it strictly beats, each island taken at most
/// once. Returns offspring index -> island index.
pub fn assign_offspring(
    island_fitness: &[f64],
    offspring_fitness: &[f64],
) -> HashMap<usize, usize> {
    let mut island_order: Vec<usize> = (0..island_fitness.len()).collect();
    island_order.sort_by(|&a, &b| island_fitness[a].total_cmp(&island_fitness[b]));
    let mut offspring_order: Vec<usize> = (0..offspring_fitness.len()).collect();
    offspring_order.sort_by(|&a, &b| offspring_fitness[a].total_cmp(&offspring_fitness[b]));

    let mut assignments = HashMap::new();
    let mut i = 0;
    let mut o = 0;
    while o < offspring_order.len() && i < island_order.len() {
        let off_idx = offspring_order[o];
        let isl_idx = island_order[i];
        if offspring_fitness[off_idx] < island_fitness[isl_idx] {
            assignments.insert(off_idx, isl_idx);
            o += 1;
            i += 1;
        } else {
            i += 1;
        }
    }
    assignments
}
