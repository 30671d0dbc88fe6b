use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::SeedableRng;

use polyvolve::engine::genome::random_genome;
use polyvolve::engine::operators::{
    crossover, flip_mutate, random_crossover_points, random_positions, CrossoverParams,
    MutationSet,
};

#[test]
fn flipping_the_same_set_twice_is_the_identity() {
    let mut rng = StdRng::seed_from_u64(99);
    let genome = random_genome(64, &mut rng);
    let positions: MutationSet = [0, 7, 31, 63].into_iter().collect();

    let once = flip_mutate(&genome, &positions);
    assert_ne!(once, genome);
    assert_eq!(flip_mutate(&once, &positions), genome);
}

#[test]
fn random_positions_covers_the_extremes() {
    let mut rng = StdRng::seed_from_u64(5);
    assert!(random_positions(100, 0.0, &mut rng).is_empty());

    let all: MutationSet = random_positions(100, 1.0, &mut rng);
    assert_eq!(all, (0..100).collect::<BTreeSet<_>>());
}

#[test]
fn random_positions_count_tracks_the_rate() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut total = 0;
    for _ in 0..100 {
        total += random_positions(1000, 0.01, &mut rng).len();
    }
    // 100 draws of expectation 10: far from 0, far from 1000 per draw.
    assert!((500..=1500).contains(&total), "total = {total}");
}

#[test]
fn crossover_without_points_is_a_no_op() {
    let a = vec![0u8, 0, 0, 0];
    let b = vec![1u8, 1, 1, 1];
    assert_eq!(crossover(&a, &b, &[]), (a.clone(), b.clone()));
}

#[test]
fn crossover_swaps_alternating_segments() {
    let a: Vec<char> = "abcdef".chars().collect();
    let b: Vec<char> = "ABCDEF".chars().collect();
    // Swap [1,3), then [5,end).
    let (c, d) = crossover(&a, &b, &[1, 3, 5]);
    assert_eq!(c.iter().collect::<String>(), "aBCdeF");
    assert_eq!(d.iter().collect::<String>(), "AbcDEf");
}

#[test]
fn crossover_is_self_inverse() {
    let mut rng = StdRng::seed_from_u64(17);
    let a = random_genome(40, &mut rng);
    let b = random_genome(40, &mut rng);
    let points = [3, 11, 20, 35];

    let (c, d) = crossover(&a, &b, &points);
    assert_eq!(crossover(&c, &d, &points), (a, b));
}

#[test]
fn crossover_of_unequal_lengths_preserves_total_length() {
    let a = vec![0u8; 4];
    let b = vec![1u8; 8];
    let (c, d) = crossover(&a, &b, &[2, 6]);
    // Segments swap verbatim, so the individual lengths change.
    assert_eq!(c.len() + d.len(), 12);
    assert_ne!(c.len(), 4);
}

#[test]
fn crossover_points_are_sorted_and_respect_the_minimum() {
    let mut rng = StdRng::seed_from_u64(2024);
    let params = CrossoverParams {
        min_events: 2,
        ..CrossoverParams::default()
    };
    for _ in 0..200 {
        let points = random_crossover_points(100, 100, &params, &mut rng).unwrap();
        assert!(points.len() >= 2);
        assert!(points.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn crossover_point_positions_center_on_the_mean_length() {
    let mut rng = StdRng::seed_from_u64(31);
    let params = CrossoverParams::default();
    let mut sum = 0usize;
    let mut count = 0usize;
    for _ in 0..500 {
        for p in random_crossover_points(100, 100, &params, &mut rng).unwrap() {
            sum += p;
            count += 1;
        }
    }
    let mean = sum as f64 / count as f64;
    // pos_mu = 0.5 over length 100: the draw centers near 50.
    assert!((40.0..=60.0).contains(&mean), "mean = {mean}");
}
