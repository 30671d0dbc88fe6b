//! One independently evolving lineage: a single-individual hill climber.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::engine::codec::ShapeCodec;
use crate::engine::genome::Genome;
use crate::engine::operators::{
    flip_mutate, random_positions, random_weighted_positions, MutationSet,
};
use crate::engine::transpose::transpose;
use crate::error::{PolyvolveError, Result};
use crate::eval::{GenomeEvaluator, Individual};

/// Flip sets below this size are memoized when they fail to improve.
/// Single- and double-locus mutations repeat combinatorially, and near a
/// local optimum almost none of them ever improve again.
const CACHEABLE_SET_SIZE: usize = 3;

/// Per-island knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IslandSettings {
    /// Iterations per `run()` call when the caller does not override.
    pub run_iterations: usize,
    /// Expected number of flipped loci per mutation event.
    pub k_mut: f64,
    /// Probability that an iteration performs a transposition instead of a
    /// flip mutation.
    pub p_transposition: f64,
    /// Probability that a transposition is replicative (grows the genome).
    pub p_replicative: f64,
    /// Experimental: per-locus mutation probabilities adapted from
    /// success/failure feedback instead of a uniform rate.
    pub positional_mutations: bool,
    /// Multiplier applied to per-locus rates in positional mode.
    pub mutation_learning_rate: f64,
}

impl Default for IslandSettings {
    fn default() -> Self {
        Self {
            run_iterations: 1000,
            k_mut: 1.0,
            p_transposition: 0.0,
            p_replicative: 0.0,
            positional_mutations: false,
            mutation_learning_rate: 1.001,
        }
    }
}

/// Cumulative counters, for reporting and throughput tuning only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IslandStats {
    pub evaluations: u64,
    pub skipped_evaluations: u64,
    pub failed_iterations: u64,
    pub eval_seconds: f64,
}

/// Serializable snapshot of an island. Everything needed to resume a run
/// losslessly: genome, counters, iteration number, cached bad mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IslandState {
    pub genome: Genome,
    pub fitness: f64,
    pub adam: Genome,
    pub iteration: u64,
    pub settings: IslandSettings,
    pub good_mutations: HashMap<usize, u64>,
    pub bad_mutations: HashMap<usize, u64>,
    pub bad_mutation_cache: HashSet<MutationSet>,
    pub p_mutations: Option<Vec<f64>>,
    pub stats: IslandStats,
}

pub struct Island {
    codec: ShapeCodec,
    evaluator: Arc<dyn GenomeEvaluator>,
    settings: IslandSettings,
    rng: StdRng,

    best: Individual,
    adam: Genome,
    id: String,
    iteration: u64,

    /// Per-locus success/failure tallies.
    good_mutations: HashMap<usize, u64>,
    bad_mutations: HashMap<usize, u64>,
    /// Small flip sets known not to improve the current best. Keyed to the
    /// current genome: cleared on every accepted improvement.
    bad_mutation_cache: HashSet<MutationSet>,
    /// Per-locus rates, present only in positional mode.
    p_mutations: Option<Vec<f64>>,

    stats: IslandStats,
}

impl Island {
    pub fn new(
        codec: ShapeCodec,
        evaluator: Arc<dyn GenomeEvaluator>,
        settings: IslandSettings,
        seed_genome: Option<Genome>,
        mut rng: StdRng,
    ) -> Result<Self> {
        if codec.genome_size() == 0 {
            return Err(PolyvolveError::Configuration(
                "cannot build an island over a zero-length genome".to_string(),
            ));
        }
        let genome = seed_genome.unwrap_or_else(|| codec.generate(&mut rng));
        let best = evaluator.evaluate(&codec, &genome)?;
        let p_mutations = settings
            .positional_mutations
            .then(|| vec![settings.k_mut / codec.genome_size() as f64; codec.genome_size()]);

        Ok(Self {
            id: genome_id(&genome),
            adam: genome,
            codec,
            evaluator,
            settings,
            rng,
            best,
            iteration: 0,
            good_mutations: HashMap::new(),
            bad_mutations: HashMap::new(),
            bad_mutation_cache: HashSet::new(),
            p_mutations,
            stats: IslandStats::default(),
        })
    }

    /// Rebuild an island from a persisted snapshot. The phenotype is
    /// re-rendered from the genome, which is deterministic.
    pub fn restore(
        codec: ShapeCodec,
        evaluator: Arc<dyn GenomeEvaluator>,
        state: IslandState,
        rng: StdRng,
    ) -> Result<Self> {
        let best = evaluator.evaluate(&codec, &state.genome)?;
        Ok(Self {
            id: genome_id(&state.adam),
            adam: state.adam,
            codec,
            evaluator,
            settings: state.settings,
            rng,
            best,
            iteration: state.iteration,
            good_mutations: state.good_mutations,
            bad_mutations: state.bad_mutations,
            bad_mutation_cache: state.bad_mutation_cache,
            p_mutations: state.p_mutations,
            stats: state.stats,
        })
    }

    pub fn snapshot(&self) -> IslandState {
        IslandState {
            genome: self.best.genome.clone(),
            fitness: self.best.fitness,
            adam: self.adam.clone(),
            iteration: self.iteration,
            settings: self.settings.clone(),
            good_mutations: self.good_mutations.clone(),
            bad_mutations: self.bad_mutations.clone(),
            bad_mutation_cache: self.bad_mutation_cache.clone(),
            p_mutations: self.p_mutations.clone(),
            stats: self.stats.clone(),
        }
    }

    pub fn best(&self) -> &Individual {
        &self.best
    }

    pub fn best_fitness(&self) -> f64 {
        self.best.fitness
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn adam(&self) -> &Genome {
        &self.adam
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn stats(&self) -> &IslandStats {
        &self.stats
    }

    pub fn run_iterations(&self) -> usize {
        self.settings.run_iterations
    }

    /// Replace the resident individual with an externally bred one. The
    /// bad-mutation cache is keyed to the replaced genome and is dropped.
    pub fn install(&mut self, individual: Individual) {
        self.bad_mutation_cache.clear();
        self.best = individual;
    }

    /// Run the configured batch of iterations.
    pub fn run_batch(&mut self) -> Result<f64> {
        self.run(self.settings.run_iterations)
    }

    /// Run `iterations` hill-climbing steps. Returns the signed fitness
    /// delta between call start and call end (negative = improvement).
    /// Internal state persists across calls; there is no terminal state.
    pub fn run(&mut self, iterations: usize) -> Result<f64> {
        let start_fitness = self.best.fitness;

        for _ in 0..iterations {
            self.iteration += 1;

            if self.rng.gen::<f64>() < self.settings.p_transposition {
                self.transposition_step()?;
                continue;
            }
            self.flip_step()?;
        }

        let delta = self.best.fitness - start_fitness;
        debug!(
            "island {}: it={} fitness={} delta={:+} (ev={} skipped={})",
            self.id,
            self.iteration,
            self.best.fitness,
            delta,
            self.stats.evaluations,
            self.stats.skipped_evaluations,
        );
        Ok(delta)
    }

    fn flip_step(&mut self) -> Result<()> {
        let len = self.best.genome.len();
        let positions = match &self.p_mutations {
            Some(rates) => random_weighted_positions(rates, &mut self.rng),
            None => random_positions(len, self.settings.k_mut / len as f64, &mut self.rng),
        };

        // Memoized failures skip the expensive render+score path entirely.
        if positions.len() < CACHEABLE_SET_SIZE && self.bad_mutation_cache.contains(&positions) {
            self.stats.skipped_evaluations += 1;
            return Ok(());
        }

        let child_genome = flip_mutate(&self.best.genome, &positions);
        let child = self.evaluate(&child_genome)?;

        if child.fitness < self.best.fitness {
            self.on_improvement(&positions);
            self.best = child;
        } else {
            self.stats.failed_iterations += 1;
            if positions.len() < CACHEABLE_SET_SIZE {
                self.bad_mutation_cache.insert(positions.clone());
            }
            self.on_failure(&positions);
        }
        Ok(())
    }

    fn transposition_step(&mut self) -> Result<()> {
        let len = self.best.genome.len();
        let a = self.rng.gen_range(0..=len);
        let b = self.rng.gen_range(0..=len);
        let dst = self.rng.gen_range(0..=len);
        let replicative = self.rng.gen::<f64>() < self.settings.p_replicative;
        let inverted = self.rng.gen_bool(0.5);

        let mut child_genome = self.best.genome.clone();
        transpose(&mut child_genome, a.min(b), a.max(b), dst, replicative, inverted);
        let child = self.evaluate(&child_genome)?;

        if child.fitness < self.best.fitness {
            // No per-locus bookkeeping for transpositions, but the cache is
            // keyed to the replaced genome and must go.
            self.bad_mutation_cache.clear();
            self.best = child;
        } else {
            self.stats.failed_iterations += 1;
        }
        Ok(())
    }

    fn evaluate(&mut self, genome: &Genome) -> Result<Individual> {
        let t0 = Instant::now();
        let individual = self.evaluator.evaluate(&self.codec, genome)?;
        self.stats.evaluations += 1;
        self.stats.eval_seconds += t0.elapsed().as_secs_f64();
        Ok(individual)
    }

    fn on_improvement(&mut self, positions: &MutationSet) {
        for &pos in positions {
            *self.good_mutations.entry(pos).or_insert(0) += 1;
        }
        self.bad_mutation_cache.clear();

        if let Some(rates) = &mut self.p_mutations {
            let lr = self.settings.mutation_learning_rate;
            for &pos in positions {
                rates[pos] = (rates[pos] * lr).min(1.0);
            }
        }
    }

    fn on_failure(&mut self, positions: &MutationSet) {
        for &pos in positions {
            *self.bad_mutations.entry(pos).or_insert(0) += 1;
        }

        if let Some(rates) = &mut self.p_mutations {
            let lr = self.settings.mutation_learning_rate;
            for &pos in positions {
                rates[pos] /= lr;
            }
        }
    }
}

/// Stable short id derived from the founder genome; used in snapshot
/// directory names, so it must not vary across toolchain releases.
fn genome_id(genome: &Genome) -> String {
    let digest = Sha1::digest(genome);
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}
