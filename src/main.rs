use std::env;
use std::sync::Arc;

use anyhow::Context;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use polyvolve::config::ConfigManager;
use polyvolve::engine::Orchestrator;
use polyvolve::eval::ImageEvaluator;
use polyvolve::history::HistoryIo;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "polyvolve.toml".to_string());
    let manager = ConfigManager::new();
    manager
        .load_from_file(&config_path)
        .with_context(|| format!("loading {config_path}"))?;
    let config = manager.get();

    let seed = config.run.seed.or_else(|| {
        env::var("RANDOMSEED").ok().and_then(|s| s.parse().ok())
    });
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let evaluator = Arc::new(ImageEvaluator::new(
        &config.codec.target,
        config.codec.target_mode,
        config.codec.resize,
    )?);
    info!(
        "target: {} ({}x{})",
        config.codec.target.display(),
        evaluator.target_size().0,
        evaluator.target_size().1,
    );
    let codec = config.codec.build_codec(evaluator.target_size())?;
    info!("genome length: {}", codec.genome_size());

    let history = HistoryIo::new(&config)?;
    let mut orchestrator = if history.exists() && !config.run.restart {
        info!("resuming existing history {}", history.id());
        let status = history.resume()?;
        Orchestrator::resume(
            codec,
            evaluator,
            &config.evolution,
            &config.run,
            status,
            rng,
        )?
    } else {
        info!("brand new history {}", history.id());
        history.init()?;
        Orchestrator::new(codec, evaluator, &config.evolution, &config.run, rng)?
    };

    let mut session_rounds = 0u64;
    loop {
        let report = orchestrator.run_round()?;

        for (i, delta) in report.deltas.iter().enumerate() {
            let island = &orchestrator.islands()[i];
            info!(
                "island {i}: it = {}, sse = {} ({delta:+})",
                island.iteration(),
                island.best_fitness(),
            );
            if *delta < 0.0 {
                history.save_island_best(
                    island.id(),
                    island.iteration(),
                    island.best_fitness(),
                    &island.best().pixels,
                )?;
            }
        }

        if report.new_best {
            let best = orchestrator.best_offspring();
            info!("new best crossover: sse = {}", best.fitness);
            history.save_image("best-crossover.png", &best.pixels)?;
        }
        history.save(&orchestrator.status())?;

        session_rounds += 1;
        if config.run.max_rounds > 0 && session_rounds >= config.run.max_rounds {
            break;
        }
    }
    info!("stopping after {session_rounds} rounds");
    Ok(())
}
