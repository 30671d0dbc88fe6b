use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;

use polyvolve::engine::codec::ShapeCodec;
use polyvolve::engine::genome::Genome;
use polyvolve::engine::island::{Island, IslandSettings, IslandState};
use polyvolve::error::Result;
use polyvolve::eval::{GenomeEvaluator, Individual};
use polyvolve::render::{PixelBuffer, PixelMode, ShapeKind};

fn small_codec() -> ShapeCodec {
    ShapeCodec::new((2, 2), ShapeKind::Triangle, 1, 8, PixelMode::L, vec![]).unwrap()
}

fn empty_pixels() -> PixelBuffer {
    PixelBuffer::new(1, 1, PixelMode::L)
}

/// Always returns the same fitness, so nothing ever improves. Records every
/// genome it was asked to score.
struct FlatEvaluator {
    seen: Mutex<Vec<Genome>>,
}

impl FlatEvaluator {
    fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl GenomeEvaluator for FlatEvaluator {
    fn evaluate(&self, _codec: &ShapeCodec, genome: &Genome) -> Result<Individual> {
        self.seen.lock().unwrap().push(genome.clone());
        Ok(Individual {
            genome: genome.clone(),
            pixels: empty_pixels(),
            fitness: 100.0,
        })
    }
}

/// Every call scores strictly better than the previous one, so every
/// candidate is accepted.
struct ImprovingEvaluator {
    next: Mutex<f64>,
}

impl ImprovingEvaluator {
    fn new() -> Self {
        Self {
            next: Mutex::new(1_000_000.0),
        }
    }
}

impl GenomeEvaluator for ImprovingEvaluator {
    fn evaluate(&self, _codec: &ShapeCodec, genome: &Genome) -> Result<Individual> {
        let mut next = self.next.lock().unwrap();
        *next -= 1.0;
        Ok(Individual {
            genome: genome.clone(),
            pixels: empty_pixels(),
            fitness: *next,
        })
    }
}

/// Flat landscape with exactly one improvement, on the `improve_at`-th
/// evaluation. Records every genome it scores.
struct OneImprovementEvaluator {
    improve_at: u64,
    calls: Mutex<u64>,
    seen: Mutex<Vec<Genome>>,
}

impl OneImprovementEvaluator {
    fn new(improve_at: u64) -> Self {
        Self {
            improve_at,
            calls: Mutex::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl GenomeEvaluator for OneImprovementEvaluator {
    fn evaluate(&self, _codec: &ShapeCodec, genome: &Genome) -> Result<Individual> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        self.seen.lock().unwrap().push(genome.clone());
        let fitness = if *calls == self.improve_at { 10.0 } else { 100.0 };
        Ok(Individual {
            genome: genome.clone(),
            pixels: empty_pixels(),
            fitness,
        })
    }
}

fn island_with<E: GenomeEvaluator + 'static>(
    evaluator: E,
    settings: IslandSettings,
    seed: u64,
) -> Island {
    Island::new(
        small_codec(),
        Arc::new(evaluator),
        settings,
        None,
        StdRng::seed_from_u64(seed),
    )
    .unwrap()
}

fn hamming(a: &Genome, b: &Genome) -> usize {
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count()
}

#[test]
fn failed_small_mutations_are_never_evaluated_twice() {
    let evaluator = Arc::new(FlatEvaluator::new());
    let mut island = Island::new(
        small_codec(),
        evaluator.clone(),
        IslandSettings::default(),
        None,
        StdRng::seed_from_u64(7),
    )
    .unwrap();
    let adam = island.adam().clone();

    island.run(2000).unwrap();

    // With a flat landscape the best never moves, so every candidate is a
    // flip of the founder. Candidates closer than the cacheable size must
    // all be distinct: a repeat would mean a cache miss.
    let seen = evaluator.seen.lock().unwrap();
    let mut small = HashSet::new();
    for genome in seen.iter().skip(1) {
        if hamming(genome, &adam) < 3 {
            assert!(small.insert(genome.clone()), "re-evaluated {genome:?}");
        }
    }

    // On a 25-locus genome with k_mut = 1 the cache fires a lot.
    assert!(island.stats().skipped_evaluations > 0);
    assert_eq!(island.best_fitness(), 100.0);
}

#[test]
fn improvements_clear_the_cache_and_are_always_evaluated() {
    let mut island = island_with(ImprovingEvaluator::new(), IslandSettings::default(), 21);

    let delta = island.run(500).unwrap();

    // Every iteration improved: nothing was ever cached long enough to skip.
    assert!(delta < 0.0);
    assert_eq!(island.stats().skipped_evaluations, 0);
    assert_eq!(island.stats().failed_iterations, 0);
    assert_eq!(island.stats().evaluations, 500); // exactly one per iteration
}

#[test]
fn an_improvement_reopens_previously_cached_mutations() {
    let evaluator = Arc::new(OneImprovementEvaluator::new(300));
    let mut island = Island::new(
        small_codec(),
        evaluator.clone(),
        IslandSettings::default(),
        None,
        StdRng::seed_from_u64(41),
    )
    .unwrap();

    island.run(3000).unwrap();

    // The 300th evaluation improved and became the resident genome; by
    // then the empty flip set had long been cached as failing and skipped.
    assert_eq!(island.best_fitness(), 10.0);
    assert!(island.stats().skipped_evaluations > 0);

    let seen = evaluator.seen.lock().unwrap();
    let improved = seen[299].clone();
    assert_eq!(island.best().genome, improved);

    // Only the empty flip set reproduces the resident genome, so every
    // later sighting of it is a replay of that cached set. Exactly one:
    // the improvement cleared the cache (the replay reached the evaluator
    // again), and the failed replay was then cached anew.
    let replays = seen[300..].iter().filter(|g| **g == improved).count();
    assert_eq!(replays, 1);
}

#[test]
fn run_delta_is_zero_without_improvement() {
    let mut island = island_with(FlatEvaluator::new(), IslandSettings::default(), 3);
    let delta = island.run(100).unwrap();
    assert_eq!(delta, 0.0);
    assert!(island.stats().failed_iterations > 0);
}

#[test]
fn state_survives_across_run_calls() {
    let mut island = island_with(ImprovingEvaluator::new(), IslandSettings::default(), 5);

    island.run(50).unwrap();
    let fitness_after_first = island.best_fitness();
    assert_eq!(island.iteration(), 50);

    island.run(50).unwrap();
    assert_eq!(island.iteration(), 100);
    assert!(island.best_fitness() < fitness_after_first);
}

#[test]
fn transpositions_keep_genome_length_when_not_replicative() {
    let settings = IslandSettings {
        p_transposition: 1.0,
        ..IslandSettings::default()
    };
    let mut island = island_with(ImprovingEvaluator::new(), settings, 13);
    island.run(200).unwrap();
    assert_eq!(island.best().genome.len(), small_codec().genome_size());
}

#[test]
fn snapshot_round_trips_through_json() {
    let mut island = island_with(ImprovingEvaluator::new(), IslandSettings::default(), 17);
    island.run(100).unwrap();
    let snapshot = island.snapshot();

    let json = serde_json::to_string(&snapshot).unwrap();
    let state: IslandState = serde_json::from_str(&json).unwrap();
    assert_eq!(state.genome, snapshot.genome);
    assert_eq!(state.iteration, snapshot.iteration);
    assert_eq!(state.bad_mutation_cache, snapshot.bad_mutation_cache);
    assert_eq!(state.good_mutations, snapshot.good_mutations);

    let restored = Island::restore(
        small_codec(),
        Arc::new(ImprovingEvaluator::new()),
        state,
        StdRng::seed_from_u64(0),
    )
    .unwrap();
    assert_eq!(restored.iteration(), island.iteration());
    assert_eq!(restored.adam(), island.adam());
    assert_eq!(restored.best().genome, island.best().genome);
}

#[test]
fn seeded_islands_start_from_the_given_genome() {
    let codec = small_codec();
    let seed_genome = vec![0; codec.genome_size()];
    let island = Island::new(
        codec,
        Arc::new(FlatEvaluator::new()),
        IslandSettings::default(),
        Some(seed_genome.clone()),
        StdRng::seed_from_u64(1),
    )
    .unwrap();
    assert_eq!(island.adam(), &seed_genome);
    assert_eq!(island.best().genome, seed_genome);
}

#[test]
fn positional_mode_behaves_like_a_regular_hill_climber() {
    let settings = IslandSettings {
        positional_mutations: true,
        ..IslandSettings::default()
    };
    let mut island = island_with(ImprovingEvaluator::new(), settings, 29);
    let delta = island.run(200).unwrap();
    assert!(delta < 0.0);
    assert_eq!(island.iteration(), 200);
}
