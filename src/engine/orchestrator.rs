//! Round loop: run all islands in parallel, breed their best genomes, keep
//! the best offspring, repeat. Also owns the adaptive worker-count tuner.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::{EvolutionConfig, RunConfig};
use crate::engine::codec::ShapeCodec;
use crate::engine::genome::{genetic_distances, opposite_genome};
use crate::engine::island::Island;
use crate::engine::mating::{assign_offspring, mate, MatingConfig};
use crate::error::{PolyvolveError, Result};
use crate::eval::{GenomeEvaluator, Individual};
use crate::history::RunStatus;
use crate::utils::RunningMean;

/// What happened in one round, for logging and snapshot decisions.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub workers: usize,
    /// Per-island signed fitness change (negative = improved).
    pub deltas: Vec<f64>,
    /// Island iterations per wall-clock second.
    pub speed: f64,
    /// Mean pairwise Hamming distance between island genomes.
    pub mean_distance: f64,
    /// Whether the global best offspring improved this round.
    pub new_best: bool,
}

pub struct Orchestrator {
    codec: ShapeCodec,
    evaluator: Arc<dyn GenomeEvaluator>,
    mating: MatingConfig,
    islands: Vec<Island>,
    best_offspring: Individual,
    tuner: WorkerTuner,
    fixed_workers: usize,
    rng: StdRng,
    rounds: u64,
}

impl Orchestrator {
    /// Build a fresh population. Islands get a rising mutation-rate ladder
    /// and every second island starts from the bitwise complement of the
    /// previous one's founder, spreading the population over the genome
    /// space from round one.
    pub fn new(
        codec: ShapeCodec,
        evaluator: Arc<dyn GenomeEvaluator>,
        evolution: &EvolutionConfig,
        run: &RunConfig,
        mut rng: StdRng,
    ) -> Result<Self> {
        let mut islands: Vec<Island> = Vec::with_capacity(evolution.n_islands);
        while islands.len() < evolution.n_islands {
            let index = islands.len();
            let seed_genome = match islands.last() {
                Some(previous) if index % 2 == 1 => Some(opposite_genome(previous.adam())),
                _ => None,
            };
            islands.push(Island::new(
                codec.clone(),
                evaluator.clone(),
                evolution.island_settings(index),
                seed_genome,
                StdRng::seed_from_u64(rng.gen()),
            )?);
        }
        let best_offspring = islands[0].best().clone();

        Ok(Self {
            tuner: WorkerTuner::new(max_workers(evolution.n_islands)),
            fixed_workers: run.workers,
            mating: evolution.mating(),
            codec,
            evaluator,
            islands,
            best_offspring,
            rng,
            rounds: 0,
        })
    }

    /// Rebuild from a persisted status. Island RNGs restart from fresh
    /// seeds; the search itself resumes exactly where it stopped.
    pub fn resume(
        codec: ShapeCodec,
        evaluator: Arc<dyn GenomeEvaluator>,
        evolution: &EvolutionConfig,
        run: &RunConfig,
        status: RunStatus,
        mut rng: StdRng,
    ) -> Result<Self> {
        if status.islands.is_empty() {
            return Err(PolyvolveError::Persistence(
                "saved status holds no islands".to_string(),
            ));
        }
        let n_islands = status.islands.len();
        let islands = status
            .islands
            .into_iter()
            .map(|state| {
                Island::restore(
                    codec.clone(),
                    evaluator.clone(),
                    state,
                    StdRng::seed_from_u64(rng.gen()),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tuner: WorkerTuner::new(max_workers(n_islands)),
            fixed_workers: run.workers,
            mating: evolution.mating(),
            codec,
            evaluator,
            islands,
            best_offspring: status.best_offspring,
            rng,
            rounds: status.rounds,
        })
    }

    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    pub fn best_offspring(&self) -> &Individual {
        &self.best_offspring
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn status(&self) -> RunStatus {
        RunStatus {
            islands: self.islands.iter().map(Island::snapshot).collect(),
            best_offspring: self.best_offspring.clone(),
            rounds: self.rounds,
        }
    }

    /// One full round: parallel island batches, then a mating phase whose
    /// winner may update the global best and displace a weaker island.
    pub fn run_round(&mut self) -> Result<RoundReport> {
        let workers = if self.fixed_workers > 0 {
            self.fixed_workers
        } else {
            self.tuner.choose()
        };
        info!("running {} islands across {} workers", self.islands.len(), workers);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| PolyvolveError::Evolution(format!("worker pool: {e}")))?;
        let t0 = Instant::now();
        let deltas: Vec<f64> = pool.install(|| {
            self.islands
                .par_iter_mut()
                .map(Island::run_batch)
                .collect::<Result<Vec<_>>>()
        })?;
        let elapsed = t0.elapsed().as_secs_f64().max(f64::EPSILON);

        let iterations: usize = self.islands.iter().map(Island::run_iterations).sum();
        let speed = iterations as f64 / elapsed;
        info!("round speed: {:.3} it/s", speed);
        if self.fixed_workers == 0 {
            self.tuner.record(workers, speed);
        }

        let genomes: Vec<_> = self
            .islands
            .iter()
            .map(|island| island.best().genome.clone())
            .collect();
        let distances = genetic_distances(&genomes);
        let mean_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<usize>() as f64 / distances.len() as f64
        };
        debug!("mean genetic distance: {:.3}", mean_distance);

        let winner = mate(
            &self.codec,
            self.evaluator.as_ref(),
            &genomes,
            &self.mating,
            &mut self.rng,
        )?;
        let mut new_best = false;
        if let Some(candidate) = winner {
            if candidate.fitness < self.best_offspring.fitness {
                info!("new best offspring: {}", candidate.fitness);
                self.best_offspring = candidate.clone();
                new_best = true;
            }
            let island_fitness: Vec<f64> =
                self.islands.iter().map(Island::best_fitness).collect();
            if let Some(&island_index) =
                assign_offspring(&island_fitness, &[candidate.fitness]).get(&0)
            {
                debug!("offspring displaces island {island_index}");
                self.islands[island_index].install(candidate);
            }
        }

        self.rounds += 1;
        Ok(RoundReport {
            workers,
            deltas,
            speed,
            mean_distance,
            new_best,
        })
    }
}

fn max_workers(n_islands: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (n_islands * 2).max(cpus * 2)
}

/// Picks the worker count for each round from measured throughput.
///
/// Until every candidate count has [`SAMPLES_PER_CANDIDATE`] speed samples
/// the tuner cycles through all of them; after that it settles on the count
/// with the highest mean iterations-per-second.
pub struct WorkerTuner {
    /// Index `i` holds the running mean speed of `i + 1` workers.
    means: Vec<RunningMean>,
    next: usize,
}

const SAMPLES_PER_CANDIDATE: u64 = 3;

impl WorkerTuner {
    pub fn new(max_workers: usize) -> Self {
        Self {
            means: vec![RunningMean::new(); max_workers.max(1)],
            next: 0,
        }
    }

    pub fn choose(&mut self) -> usize {
        let explored = self
            .means
            .iter()
            .all(|m| m.count() >= SAMPLES_PER_CANDIDATE);
        if explored {
            let best = self
                .means
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.mean().total_cmp(&b.mean()))
                .map(|(i, _)| i + 1)
                .unwrap_or(1);
            debug!("worker tuner settled on {best} workers");
            return best;
        }
        let workers = self.next + 1;
        self.next = (self.next + 1) % self.means.len();
        workers
    }

    pub fn record(&mut self, workers: usize, speed: f64) {
        if let Some(mean) = self.means.get_mut(workers - 1) {
            mean.update(speed);
        }
    }
}
