//! Interactive demo for `adaptive-sampler`: drives a synthetic event stream through an
//! [`AdaptiveSampler`] and periodically prints its learned state.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use adaptive_sampler::{AdaptiveSampler, SamplerConfig};
use clap::Parser;
use rand::Rng;

/// Drive a synthetic event stream through an adaptive sampler and watch it converge.
#[derive(Parser)]
#[command(name = "adaptive-sampler-cli")]
#[command(about = "Demo driver for the adaptive-sampler crate", long_about = None)]
#[command(version)]
struct Cli {
    /// Target accepted samples per minute; derives window size and lookbacks via the crate's
    /// built-in heuristic. Ignored if `--config-file` is given.
    #[arg(long, default_value_t = 3_000)]
    target_per_minute: u64,

    /// Load a `SamplerConfig` from a TOML file instead of deriving one from
    /// `--target-per-minute`.
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Synthetic event rate to feed the sampler, in events/second.
    #[arg(long, default_value_t = 2_000)]
    events_per_second: u64,

    /// How long to run the demo, in seconds.
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,

    /// How often to print a snapshot of the sampler's learned state, in seconds.
    #[arg(long, default_value_t = 1)]
    snapshot_interval_secs: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
            |_| "adaptive_sampler=debug,adaptive_sampler_cli=info".into(),
        ))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            SamplerConfig::from_toml_str(&text)?
        }
        None => SamplerConfig::for_target_rate(cli.target_per_minute),
    };

    tracing::info!(?config, "starting adaptive-sampler demo");
    let sampler = AdaptiveSampler::new(config)?;

    let run_until = Instant::now() + Duration::from_secs(cli.duration_secs);
    let mut next_snapshot = Instant::now() + Duration::from_secs(cli.snapshot_interval_secs);
    let per_tick_sleep = Duration::from_secs_f64(1.0 / cli.events_per_second.max(1) as f64);

    let mut offered = 0u64;
    let mut accepted = 0u64;
    let mut rng = rand::thread_rng();

    while Instant::now() < run_until {
        offered += 1;
        if sampler.should_sample() {
            accepted += 1;
        }

        if Instant::now() >= next_snapshot {
            let snap = sampler.snapshot();
            tracing::info!(
                offered,
                accepted,
                probability = snap.probability,
                avg_count = snap.avg_count,
                avg_samples = ?snap.avg_samples,
                samples_budget = snap.samples_budget,
                "snapshot"
            );
            next_snapshot += Duration::from_secs(cli.snapshot_interval_secs);
        }

        // Jitter the synthetic inter-arrival time a little so the demo isn't perfectly periodic.
        let jitter = rng.gen_range(0.5..1.5);
        std::thread::sleep(per_tick_sleep.mul_f64(jitter));
    }

    println!("offered {offered} events, accepted {accepted} samples");
    Ok(())
}
