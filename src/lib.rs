//! Evolutionary image approximation: a genome of bits encodes a stack of
//! translucent shapes, islands of hill climbers mutate it toward a target
//! image, and periodic mating rounds recombine the islands' best genomes.

pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod history;
pub mod render;
pub mod utils;

pub use error::{PolyvolveError, Result};
