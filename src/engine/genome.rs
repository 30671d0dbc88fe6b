use rand::Rng;

/// Genome representation for the drawing search.
///
/// A genome is a fixed-width sequence of binary bases (0/1) that
/// deterministically maps to a drawable recipe: a background color plus an
/// ordered list of shapes. The `ShapeCodec` owns the bit layout; this module
/// only deals with the raw base sequence.
///
/// # Why a flat bit string instead of a shape list?
///
/// Genetic operators work best on simple, linear structures:
/// - **Crossover**: swapping genome segments is plain slicing
/// - **Point mutation**: flipping a base is trivial
/// - **No invalid states**: any bit string decodes to a valid recipe
pub type Genome = Vec<u8>;

/// Generate a uniformly random genome of `length` bases.
pub fn random_genome<R: Rng>(length: usize, rng: &mut R) -> Genome {
    (0..length).map(|_| rng.gen_range(0..=1u8)).collect()
}

/// Bitwise complement of a genome. Used to seed islands far apart in
/// genome space from a common origin.
pub fn opposite_genome(genome: &Genome) -> Genome {
    genome.iter().map(|&b| 1 - b).collect()
}

/// Pairwise Hamming distances between all given genomes.
///
/// Returns one distance per unordered pair, in combination order.
pub fn genetic_distances(genomes: &[Genome]) -> Vec<usize> {
    let mut distances = Vec::new();
    for (i, a) in genomes.iter().enumerate() {
        for b in &genomes[i + 1..] {
            let d = a.iter().zip(b.iter()).filter(|(x, y)| x != y).count();
            distances.push(d);
        }
    }
    distances
}
