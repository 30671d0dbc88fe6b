use serde::{Deserialize, Serialize};

use super::traits::ConfigSection;
use crate::engine::island::IslandSettings;
use crate::engine::mating::MatingConfig;
use crate::engine::operators::CrossoverParams;
use crate::error::{PolyvolveError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    pub n_islands: usize,
    /// Hill-climbing iterations each island runs between mating rounds.
    pub round_iterations: usize,
    /// Expected flips per mutation on the first island; island `i` gets
    /// `base_k_mut * (i + 1)`, so later islands explore more aggressively.
    pub base_k_mut: f64,
    pub p_transposition: f64,
    pub p_replicative: f64,
    pub positional_mutations: bool,
    pub mutation_learning_rate: f64,
    pub f1_size: usize,
    pub f2_size: usize,
    pub n_crossovers: usize,
    pub crossover: CrossoverParams,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            n_islands: 4,
            round_iterations: 1000,
            base_k_mut: 0.5,
            p_transposition: 0.0,
            p_replicative: 0.0,
            positional_mutations: false,
            mutation_learning_rate: 1.001,
            f1_size: 64,
            f2_size: 128,
            n_crossovers: 3,
            crossover: CrossoverParams::default(),
        }
    }
}

impl EvolutionConfig {
    pub fn k_mut_for(&self, island_index: usize) -> f64 {
        self.base_k_mut * (island_index + 1) as f64
    }

    pub fn island_settings(&self, island_index: usize) -> IslandSettings {
        IslandSettings {
            run_iterations: self.round_iterations,
            k_mut: self.k_mut_for(island_index),
            p_transposition: self.p_transposition,
            p_replicative: self.p_replicative,
            positional_mutations: self.positional_mutations,
            mutation_learning_rate: self.mutation_learning_rate,
        }
    }

    pub fn mating(&self) -> MatingConfig {
        MatingConfig {
            f1_size: self.f1_size,
            f2_size: self.f2_size,
            n_crossovers: self.n_crossovers,
            crossover: self.crossover.clone(),
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<()> {
        if self.n_islands == 0 {
            return Err(PolyvolveError::Configuration(
                "island count must be at least 1".to_string(),
            ));
        }
        if self.round_iterations == 0 {
            return Err(PolyvolveError::Configuration(
                "round iterations must be at least 1".to_string(),
            ));
        }
        if self.base_k_mut <= 0.0 {
            return Err(PolyvolveError::Configuration(
                "base mutation rate must be positive".to_string(),
            ));
        }
        for (name, p) in [
            ("p_transposition", self.p_transposition),
            ("p_replicative", self.p_replicative),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(PolyvolveError::Configuration(format!(
                    "{name} must be between 0 and 1"
                )));
            }
        }
        if self.mutation_learning_rate < 1.0 {
            return Err(PolyvolveError::Configuration(
                "mutation learning rate must be at least 1".to_string(),
            ));
        }
        self.mating().validate()
    }
}
