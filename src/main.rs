use anyhow::{Context, Result};
use dot_evolution::{GenerationEnd, Population, SimConfig, TickOutcome, TraceObserver};
use std::time::Duration;
use tracing::info;

/// Command line: `dot-evolution [CONFIG.json] [GENERATIONS] [TICK_MS]`
struct RunOptions {
    config: SimConfig,
    /// Stop after this many generations; run forever when absent
    generations: Option<u64>,
    /// Real-time pause between ticks
    tick_delay: Duration,
}

fn main() -> Result<()> {
    init_tracing();
    let options = parse_args(std::env::args().skip(1))?;

    let mut population = Population::with_observer(options.config, Box::new(TraceObserver::new()))
        .context("failed to create population")?;
    info!(generation = population.generation(), "Generation started");

    loop {
        let outcome = population.tick();
        if let TickOutcome::Ended(end) = outcome {
            let stats = population.evaluate()?;
            if end == GenerationEnd::AllDead {
                info!("All {} dots have died", population.config().pop_size);
            }
            info!("{} dot(s) died in this generation", stats.dead);
            info!("{} dot(s) managed to reach the goal", stats.finishers);
            println!("{stats}");

            population.breed()?;
            if options
                .generations
                .is_some_and(|limit| population.generation() > limit)
            {
                break;
            }
            info!(generation = population.generation(), "Generation started");
        }
        if !options.tick_delay.is_zero() {
            std::thread::sleep(options.tick_delay);
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<RunOptions> {
    let config = match args.next() {
        Some(path) if path != "-" => {
            SimConfig::load(&path).with_context(|| format!("loading config from {path}"))?
        }
        _ => SimConfig::default(),
    };
    let generations = args
        .next()
        .map(|g| g.parse::<u64>())
        .transpose()
        .context("GENERATIONS must be a non-negative integer")?;
    let tick_ms = args
        .next()
        .map(|ms| ms.parse::<u64>())
        .transpose()
        .context("TICK_MS must be a non-negative integer")?
        .unwrap_or(0);

    Ok(RunOptions {
        config,
        generations,
        tick_delay: Duration::from_millis(tick_ms),
    })
}
