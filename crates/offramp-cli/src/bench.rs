//! Decision latency benchmark
//!
//! Measures the full policy chain against a synthetic navigation workload
//! derived from the config under test: a slice of the locations are shaped
//! to hit the config's own domains and prefixes, the rest are clean
//! browsing. Latency percentiles come from per-batch wall-time samples.

use std::cmp::Ordering;
use std::fs;
use std::time::Instant;

use offramp_config::{build_policies, parse_config, GuardConfig, RuleConfig};
use offramp_core::{Location, PolicySet, RedirectPolicy};

pub const DEFAULT_SEED: u32 = 0xc0ffee;

pub struct BenchOptions {
    pub config_path: String,
    pub iterations: usize,
    pub locations: usize,
    pub warmup_ops: usize,
    pub sample_batch_ops: usize,
    pub seed: u32,
}

pub fn run(opts: BenchOptions) -> Result<(), String> {
    println!("============================================================");
    println!("Offramp Decision Benchmark");
    println!("============================================================");
    println!("Config: {}", opts.config_path);
    println!("Iterations: {}", opts.iterations);
    println!("Locations: {}", opts.locations);
    println!("Warmup ops: {}", opts.warmup_ops);
    println!("Sample batch ops: {}", opts.sample_batch_ops);
    println!("Seed: {:#x}", opts.seed);
    println!();

    let text = fs::read_to_string(&opts.config_path)
        .map_err(|e| format!("Failed to read '{}': {}", opts.config_path, e))?;
    let config = parse_config(&text).map_err(|e| e.to_string())?;
    let report = build_policies(&config).map_err(|e| e.to_string())?;
    for lint in &report.lints {
        println!("Warning: {}", lint);
    }
    let policies = report.policies;

    let locations = generate_workload(&config, opts.locations, opts.seed);
    println!("Dataset size: {} locations", locations.len());
    println!();

    println!("Warming up...");
    warmup(&policies, &locations, opts.warmup_ops);
    println!("Warmup done.");
    println!();

    let baseline = run_batched(
        "Baseline (loop only)",
        &locations,
        opts.iterations.max(1) / 4,
        opts.sample_batch_ops,
        |_| false,
    );
    println!("{}", format_result(&baseline));
    println!();

    let result = run_batched(
        "decide (full policy chain)",
        &locations,
        opts.iterations,
        opts.sample_batch_ops,
        |location| policies.decide(location).is_some(),
    );
    println!("{}", format_result(&result));
    println!();

    println!("Notes:");
    println!("- p50/p95/p99 computed from per-batch wall-time samples divided by batch size.");

    Ok(())
}

// =============================================================================
// Measurement
// =============================================================================

struct BenchResult {
    name: String,
    op_count: usize,
    total_ms: f64,
    avg_us: f64,
    p50_us: f64,
    p95_us: f64,
    p99_us: f64,
    ops_per_sec: u64,
    matched_pct: f64,
}

fn run_batched(
    name: &str,
    locations: &[Location],
    iterations: usize,
    sample_batch_ops: usize,
    mut f: impl FnMut(&Location) -> bool,
) -> BenchResult {
    let sample_batch_ops = sample_batch_ops.max(1);
    let mut samples_us = Vec::new();
    let mut matched = 0usize;
    let total_ops = locations.len() * iterations.max(1);

    let mut batch_ops = 0usize;
    let mut batch_start = Instant::now();
    let start = Instant::now();

    for _ in 0..iterations.max(1) {
        for location in locations {
            if f(location) {
                matched += 1;
            }
            batch_ops += 1;
            if batch_ops == sample_batch_ops {
                let dt = batch_start.elapsed();
                samples_us.push(dt.as_secs_f64() * 1_000_000.0 / sample_batch_ops as f64);
                batch_ops = 0;
                batch_start = Instant::now();
            }
        }
    }

    let total_ms = start.elapsed().as_secs_f64() * 1000.0;
    samples_us.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let avg_us = if total_ops == 0 {
        0.0
    } else {
        total_ms * 1000.0 / total_ops as f64
    };

    BenchResult {
        name: name.to_string(),
        op_count: total_ops,
        total_ms,
        avg_us,
        p50_us: percentile(&samples_us, 0.50),
        p95_us: percentile(&samples_us, 0.95),
        p99_us: percentile(&samples_us, 0.99),
        ops_per_sec: if total_ms > 0.0 {
            (total_ops as f64 / (total_ms / 1000.0)) as u64
        } else {
            0
        },
        matched_pct: if total_ops > 0 {
            (matched as f64 / total_ops as f64) * 100.0
        } else {
            0.0
        },
    }
}

fn format_result(result: &BenchResult) -> String {
    format!(
        "{}:\n  Ops: {}\n  Total: {:.2} ms\n  Avg: {:.3} us\n  P50: {:.3} us\n  P95: {:.3} us\n  P99: {:.3} us\n  Throughput: {} ops/sec\n  Matched: {:.1}%",
        result.name,
        result.op_count,
        result.total_ms,
        result.avg_us,
        result.p50_us,
        result.p95_us,
        result.p99_us,
        result.ops_per_sec,
        result.matched_pct,
    )
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let idx = ((values.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(values.len() - 1);
    values[idx]
}

fn warmup(policies: &PolicySet, locations: &[Location], warmup_ops: usize) {
    let loops = if locations.is_empty() {
        0
    } else {
        warmup_ops / locations.len() + 1
    };
    for _ in 0..loops {
        for location in locations {
            let _ = policies.decide(location);
        }
    }
}

// =============================================================================
// Workload Generation
// =============================================================================

fn create_rng(seed: u32) -> impl FnMut() -> f64 {
    let mut state = seed;
    move || {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        (state as f64) / (u32::MAX as f64)
    }
}

fn pick<T: Clone>(items: &[T], rand: &mut impl FnMut() -> f64) -> T {
    let idx = (rand() * items.len() as f64).floor() as usize;
    items[idx.min(items.len() - 1)].clone()
}

fn generate_workload(config: &GuardConfig, count: usize, seed: u32) -> Vec<Location> {
    const CLEAN_HOSTS: &[&str] = &[
        "example.com",
        "github.com",
        "stackoverflow.com",
        "wikipedia.org",
        "mozilla.org",
        "docs.rs",
        "crates.io",
        "news.ycombinator.com",
    ];
    const CLEAN_PATHS: &[&str] = &[
        "/",
        "/about",
        "/video/123",
        "/docs/index.html",
        "/api/v1/data",
        "/settings/privacy",
        "/search?q=weekend+plans",
    ];
    const SUBDOMAIN_PREFIXES: &[&str] = &["", "www.", "m.", "login."];

    let mut rule_hosts: Vec<String> = Vec::new();
    let mut rule_paths: Vec<String> = Vec::new();
    for rule in &config.rules {
        match rule {
            RuleConfig::PathRedirect {
                prefixes,
                include_root,
                hosts,
                ..
            } => {
                rule_hosts.extend(hosts.iter().cloned());
                for prefix in prefixes {
                    rule_paths.push(prefix.clone());
                    rule_paths.push(format!("{}/42", prefix));
                }
                if *include_root {
                    rule_paths.push("/".to_string());
                }
            }
            RuleConfig::HostBlocklist { domains, .. } => {
                rule_hosts.extend(domains.iter().cloned());
            }
        }
    }
    if rule_hosts.is_empty() {
        rule_hosts.extend(CLEAN_HOSTS.iter().map(|s| s.to_string()));
    }
    if rule_paths.is_empty() {
        rule_paths.extend(CLEAN_PATHS.iter().map(|s| s.to_string()));
    }

    let mut rng = create_rng(seed);
    let mut locations = Vec::with_capacity(count);
    for _ in 0..count {
        let targeted = rng() < 0.3;
        let (host, path) = if targeted {
            let domain = pick(&rule_hosts, &mut rng);
            let sub = pick(SUBDOMAIN_PREFIXES, &mut rng);
            let path = if rng() < 0.5 {
                pick(&rule_paths, &mut rng)
            } else {
                pick(CLEAN_PATHS, &mut rng).to_string()
            };
            (format!("{}{}", sub, domain), path)
        } else {
            (
                pick(CLEAN_HOSTS, &mut rng).to_string(),
                pick(CLEAN_PATHS, &mut rng).to_string(),
            )
        };
        locations.push(Location::new(host, path));
    }
    locations
}
