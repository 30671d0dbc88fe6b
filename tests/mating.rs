use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use polyvolve::engine::codec::ShapeCodec;
use polyvolve::engine::genome::Genome;
use polyvolve::engine::mating::{assign_offspring, mate, MatingConfig};
use polyvolve::error::Result;
use polyvolve::eval::{GenomeEvaluator, Individual};
use polyvolve::render::{PixelBuffer, PixelMode, ShapeKind};

fn small_codec() -> ShapeCodec {
    ShapeCodec::new((2, 2), ShapeKind::Triangle, 1, 8, PixelMode::L, vec![]).unwrap()
}

/// Fitness = number of set bits, so all-zero genomes are perfect. Fully
/// deterministic, which makes offspring ordering predictable.
struct BitCountEvaluator;

impl GenomeEvaluator for BitCountEvaluator {
    fn evaluate(&self, _codec: &ShapeCodec, genome: &Genome) -> Result<Individual> {
        Ok(Individual {
            genome: genome.clone(),
            pixels: PixelBuffer::new(1, 1, PixelMode::L),
            fitness: genome.iter().filter(|&&b| b == 1).count() as f64,
        })
    }
}

#[test]
fn best_offspring_differs_from_every_parent() {
    let codec = small_codec();
    let parents: Vec<Genome> = vec![
        vec![0; codec.genome_size()],
        vec![1; codec.genome_size()],
        (0..codec.genome_size()).map(|i| (i % 2) as u8).collect(),
    ];
    let mut rng = StdRng::seed_from_u64(4);

    let winner = mate(
        &codec,
        &BitCountEvaluator,
        &parents,
        &MatingConfig::default(),
        &mut rng,
    )
    .unwrap()
    .expect("distinct parents breed at least one new genome");

    assert!(parents.iter().all(|p| *p != winner.genome));
    assert_eq!(
        winner.fitness,
        winner.genome.iter().filter(|&&b| b == 1).count() as f64
    );
}

#[test]
fn identical_parents_breed_nothing_new() {
    let codec = small_codec();
    let genome = vec![0u8; codec.genome_size()];
    let parents = vec![genome.clone(), genome];
    let mut rng = StdRng::seed_from_u64(8);

    let winner = mate(
        &codec,
        &BitCountEvaluator,
        &parents,
        &MatingConfig::default(),
        &mut rng,
    )
    .unwrap();
    assert!(winner.is_none());
}

#[test]
fn evaluator_behind_an_arc_works_at_the_seam() {
    let codec = small_codec();
    let evaluator: Arc<dyn GenomeEvaluator> = Arc::new(BitCountEvaluator);
    let parents: Vec<Genome> = vec![
        vec![0; codec.genome_size()],
        vec![1; codec.genome_size()],
    ];
    let mut rng = StdRng::seed_from_u64(15);

    let winner = mate(
        &codec,
        evaluator.as_ref(),
        &parents,
        &MatingConfig::default(),
        &mut rng,
    )
    .unwrap();
    assert!(winner.is_some());
}

fn assignments(islands: &[f64], offspring: &[f64]) -> HashMap<usize, usize> {
    assign_offspring(islands, offspring)
}

#[test]
fn offspring_beating_one_island_takes_the_weakest_beatable_one() {
    assert_eq!(
        assignments(&[10.0, 40.0], &[20.0, 25.0]),
        HashMap::from([(0, 1)])
    );
}

#[test]
fn strong_offspring_sweep_the_best_islands() {
    assert_eq!(
        assignments(&[5.0, 10.0, 55.0], &[2.0, 4.0]),
        HashMap::from([(0, 0), (1, 1)])
    );
}

#[test]
fn assignment_is_by_rank_not_by_index() {
    assert_eq!(
        assignments(&[10.0, 20.0, 30.0], &[100.0, 13.0, 7.0]),
        HashMap::from([(2, 0), (1, 1)])
    );
}

#[test]
fn ties_never_displace_an_island() {
    assert_eq!(assignments(&[10.0, 10.0], &[10.0, 10.0]), HashMap::new());
    assert_eq!(
        assignments(&[7.0, 11.0], &[7.0, 11.0]),
        HashMap::from([(0, 1)])
    );
}

#[test]
fn every_assigned_offspring_strictly_beats_its_island() {
    let islands = [12.0, 3.0, 44.0, 8.0];
    let offspring = [10.0, 50.0, 2.0, 9.0];
    for (&off, &isl) in assignments(&islands, &offspring).iter() {
        assert!(offspring[off] < islands[isl]);
    }
}
