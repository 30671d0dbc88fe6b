pub mod traits;
pub mod codec;
pub mod evolution;
pub mod run;
pub mod manager;

pub use manager::{AppConfig, ConfigManager};
pub use codec::CodecConfig;
pub use evolution::EvolutionConfig;
pub use run::RunConfig;
