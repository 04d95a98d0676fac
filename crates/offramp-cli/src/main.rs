//! Offramp CLI
//!
//! CLI tool for evaluating and exercising rule configs outside a browser.

use std::fs;

use clap::{Parser, Subcommand};

use offramp_config::{build_policies, parse_config};
use offramp_core::{url, Location, RedirectPolicy};

mod bench;
mod replay;

#[derive(Parser)]
#[command(name = "offramp-cli")]
#[command(about = "Offramp navigation guard tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one URL against a rule config
    Check {
        /// Rule config file (JSON)
        #[arg(short, long)]
        config: String,

        /// URL to evaluate, e.g. https://vk.com/feed
        #[arg(short, long)]
        url: String,
    },

    /// Validate a rule config and report neutralized rules
    Validate {
        /// Rule config file (JSON)
        #[arg(short, long)]
        config: String,
    },

    /// Replay a scripted navigation session against a config
    Replay {
        /// Rule config file (JSON)
        #[arg(short, long)]
        config: String,

        /// Trace file (JSONL, one step per line)
        #[arg(short, long)]
        trace: String,
    },

    /// Measure decision latency over a synthetic workload
    Bench {
        /// Rule config file (JSON)
        #[arg(short, long)]
        config: String,

        /// Passes over the generated dataset
        #[arg(long, default_value_t = 1000)]
        iterations: usize,

        /// Locations in the generated dataset
        #[arg(long, default_value_t = 1000)]
        locations: usize,

        /// Decisions to run before measuring
        #[arg(long, default_value_t = 10000)]
        warmup_ops: usize,

        /// Decisions per latency sample
        #[arg(long, default_value_t = 1000)]
        batch_ops: usize,

        /// Workload generator seed
        #[arg(long, default_value_t = bench::DEFAULT_SEED)]
        seed: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { config, url } => cmd_check(&config, &url),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Replay { config, trace } => replay::run(replay::ReplayOptions {
            config_path: config,
            trace_path: trace,
        }),
        Commands::Bench {
            config,
            iterations,
            locations,
            warmup_ops,
            batch_ops,
            seed,
        } => bench::run(bench::BenchOptions {
            config_path: config,
            iterations,
            locations,
            warmup_ops,
            sample_batch_ops: batch_ops,
            seed,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_check(config_path: &str, url: &str) -> Result<(), String> {
    // "vk.com/feed" would be read as a bare path and silently match
    // nothing; reject the shape up front.
    if !url::is_absolute(url) && !url.starts_with('/') {
        return Err(format!(
            "URL must be absolute or start with '/', got '{}'",
            url
        ));
    }

    let text = fs::read_to_string(config_path)
        .map_err(|e| format!("Failed to read '{}': {}", config_path, e))?;
    let config = parse_config(&text).map_err(|e| e.to_string())?;
    let report = build_policies(&config).map_err(|e| e.to_string())?;

    for lint in &report.lints {
        println!("Warning: {}", lint);
    }

    let location = Location::from_url(url, "");
    match report.policies.decide(&location) {
        Some(target) => {
            println!("REDIRECT");
            println!("  Location: {}", location);
            println!("  Target:   {}", target);
        }
        None => {
            println!("PASS");
            println!("  Location: {}", location);
        }
    }

    Ok(())
}

fn cmd_validate(config_path: &str) -> Result<(), String> {
    let text = fs::read_to_string(config_path)
        .map_err(|e| format!("Failed to read '{}': {}", config_path, e))?;
    let config = parse_config(&text).map_err(|e| e.to_string())?;
    let report = build_policies(&config).map_err(|e| e.to_string())?;

    println!("Config '{}' is valid", config_path);
    println!("  Rules:       {}", config.rules.len());
    println!("  Neutralized: {}", report.lints.len());
    for (index, rule) in config.rules.iter().enumerate() {
        println!("  [{}] {}", index, rule.summary());
    }
    for lint in &report.lints {
        println!("  Warning: {}", lint);
    }

    Ok(())
}
