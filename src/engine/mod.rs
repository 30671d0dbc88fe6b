pub mod codec;
pub mod genome;
pub mod island;
pub mod mating;
pub mod operators;
pub mod orchestrator;
pub mod transpose;

pub use codec::{BitLayout, ShapeCodec};
pub use island::{Island, IslandSettings, IslandState};
pub use orchestrator::{Orchestrator, RoundReport};
