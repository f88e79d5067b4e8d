use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use bloom_core::{
    encode, estimate_false_positive_rate, BloomFilter, FilterConfig, FilterParams, Item,
};

#[derive(Parser)]
#[command(name = "bloom", about = "Bloom filter sizing and membership tools")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Size a filter for a capacity and target false-positive rate
    Plan {
        #[arg(long)]
        items: usize,
        #[arg(long)]
        fp_rate: f64,
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// False-positive rate for explicit hash/bit/item counts
    Estimate {
        #[arg(long)]
        hashes: usize,
        #[arg(long)]
        bits: usize,
        #[arg(long)]
        items: usize,
    },

    /// Load one item per line and test queries against it
    Check {
        #[arg(long)]
        items_file: PathBuf,
        /// JSON filter config; defaults to sizing for the file's line count
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 0.01)]
        fp_rate: f64,
        #[arg(required = true)]
        queries: Vec<String>,
    },

    /// Insert random strings and measure the observed false-positive rate
    Simulate {
        #[arg(long)]
        items: usize,
        #[arg(long)]
        fp_rate: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Show the canonical encoding and bit indices of a text item
    Explain {
        #[arg(long, default_value_t = 10_000)]
        items: usize,
        #[arg(long, default_value_t = 0.01)]
        fp_rate: f64,
        /// Treat the value as an integer instead of text
        #[arg(long, default_value_t = false)]
        int: bool,
        value: String,
    },
}

#[derive(Serialize)]
struct PlanReport {
    expected_items: usize,
    target_fp_rate: f64,
    bit_count: usize,
    hash_count: usize,
    bytes: usize,
    estimated_fp_rate: f64,
}

#[derive(Serialize)]
struct SimulationReport {
    inserted: usize,
    probed: usize,
    false_negatives: usize,
    false_positives: usize,
    observed_fp_rate: f64,
    estimated_fp_rate: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Plan { items, fp_rate, json } => {
            let params = FilterParams::compute(items, fp_rate)?;
            let report = PlanReport {
                expected_items: items,
                target_fp_rate: fp_rate,
                bit_count: params.bit_count,
                hash_count: params.hash_count,
                bytes: (params.bit_count + 7) / 8,
                estimated_fp_rate: params.false_positive_rate(items),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("bits:      {}", report.bit_count);
                println!("hashes:    {}", report.hash_count);
                println!("bytes:     {}", report.bytes);
                println!("estimate:  {:.6}", report.estimated_fp_rate);
            }
        }

        Cmd::Estimate { hashes, bits, items } => {
            println!("{:.6}", estimate_false_positive_rate(hashes, bits, items));
        }

        Cmd::Check { items_file, config, fp_rate, queries } => {
            let text = fs::read_to_string(&items_file)
                .with_context(|| format!("reading {}", items_file.display()))?;
            let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
            let cfg = match config {
                Some(path) => FilterConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => FilterConfig {
                    expected_items: lines.len().max(1),
                    false_positive_rate: fp_rate,
                    ..FilterConfig::default()
                },
            };
            let mut filter = BloomFilter::from_config(&cfg)?;
            filter.add_bulk(&lines)?;
            info!(items = lines.len(), bits = filter.bit_count(), "filter loaded");
            for q in &queries {
                let verdict = if filter.contains(q.as_str())? { "maybe" } else { "no" };
                println!("{q}\t{verdict}");
            }
        }

        Cmd::Simulate { items, fp_rate, seed } => {
            if items == 0 {
                bail!("--items must be at least 1");
            }
            let mut rng = StdRng::seed_from_u64(seed);
            let mut filter = BloomFilter::new(items, fp_rate)?;
            // inserted keys are 16 chars, probes 15, so the two sets never overlap
            let inserted: Vec<String> = (0..items).map(|_| random_str(&mut rng, 16)).collect();
            filter.add_bulk(&inserted)?;

            let mut false_negatives = 0;
            for s in &inserted {
                if !filter.contains(s)? {
                    false_negatives += 1;
                }
            }
            let mut false_positives = 0;
            for _ in 0..items {
                if filter.contains(&random_str(&mut rng, 15))? {
                    false_positives += 1;
                }
            }
            let report = SimulationReport {
                inserted: items,
                probed: items,
                false_negatives,
                false_positives,
                observed_fp_rate: false_positives as f64 / items as f64,
                estimated_fp_rate: filter.estimate_false_positive_rate(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Cmd::Explain { items, fp_rate, int, value } => {
            let filter = BloomFilter::new(items, fp_rate)?;
            let item = if int {
                let n: i128 = value.parse().with_context(|| format!("not an integer: {value}"))?;
                Item::Int(n)
            } else {
                Item::Text(value)
            };
            println!("kind:     {}", item.kind());
            println!("encoding: {}", hex::encode(encode(&item)));
            println!("digest:   {:?}", filter.splitter().algorithm());
            let indices = filter.indices(&item)?;
            let list: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
            println!("indices:  {}", list.join(","));
        }
    }

    Ok(())
}

fn random_str(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}
