//! agent-runner: headless analyst runner for PayWatch.
//!
//! Usage:
//!   agent-runner --data-dir ./data --sample 0.01 --index 12
//!   agent-runner --data-dir ./data --sample 0.01 --fraud
//!   agent-runner --data-dir ./data --batch 5 --offline
//!   agent-runner --data-dir ./data --convert
//!   agent-runner --data-dir ./data --info

use anyhow::Result;
use paywatch_core::{
    agent::FraudAnalyst,
    config::{AnalysisMode, DataConfig, OracleConfig},
    oracle::HttpOracle,
    record::TransactionSnapshot,
    rng::SamplerRng,
    store::{self, TransactionStore},
};
use std::env;
use std::str::FromStr;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = arg_value(&args, "--data-dir").unwrap_or_else(|| "./data".into());
    let sample: Option<f64> = arg_value(&args, "--sample").and_then(|v| v.parse().ok());
    let mode_text = arg_value(&args, "--mode").unwrap_or_else(|| "production".into());
    let index: Option<usize> = arg_value(&args, "--index").and_then(|v| v.parse().ok());
    let batch: Option<usize> = arg_value(&args, "--batch").and_then(|v| v.parse().ok());
    let seed: u64 = arg_value(&args, "--seed")
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(epoch_seconds);
    let pick_random = args.iter().any(|a| a == "--random");
    let pick_fraud = args.iter().any(|a| a == "--fraud");
    let offline = args.iter().any(|a| a == "--offline");
    let show_raw = args.iter().any(|a| a == "--raw");

    let mut config = DataConfig::new(&data_dir);
    if let Some(frac) = sample {
        config = config.with_sample_frac(frac);
    }

    if args.iter().any(|a| a == "--convert") {
        let rows = store::convert_csv_to_sqlite(&config.csv_path(), &config.sqlite_path())?;
        println!("Converted {rows} rows to {}", config.sqlite_path().display());
        return Ok(());
    }

    if args.iter().any(|a| a == "--info") {
        return print_info(&config);
    }

    let mode = AnalysisMode::from_str(&mode_text)?;
    let started = chrono::Local::now();

    println!("PayWatch agent-runner");
    println!("  started:   {}", started.format("%Y-%m-%d %H:%M:%S"));
    println!("  data_dir:  {data_dir}");
    println!("  sample:    {}", sample.map_or("full".into(), |f| format!("{f}")));
    println!("  mode:      {}", mode.as_str());
    println!("  oracle:    {}", if offline { "offline" } else { "http" });
    println!();

    let store = Arc::new(TransactionStore::load(&config)?);
    println!(
        "Loaded {} records ({} ground-truth fraud)",
        store.len(),
        store.fraud_count()
    );
    if store.is_empty() {
        anyhow::bail!("Dataset is empty after sampling; raise --sample");
    }

    let oracle = HttpOracle::new(OracleConfig::from_env())?;
    let analyst = FraudAnalyst::new(Arc::clone(&store), Box::new(oracle), mode);

    let start = pick_start_index(&store, index, pick_random, pick_fraud, seed)?;
    let count = batch.unwrap_or(1).max(1);
    let selected: Vec<TransactionSnapshot> = store.all_records()[start..]
        .iter()
        .take(count)
        .map(TransactionSnapshot::from)
        .collect();

    for (offset, tx) in selected.iter().enumerate() {
        let row = start + offset;
        println!();
        println!("=== TRANSACTION #{row} ===");
        println!("{}", tx.describe());
        if show_raw {
            println!("{}", serde_json::to_string_pretty(tx)?);
        }
        println!();

        if offline {
            let breakdown = analyst.score(tx);
            println!("{}", analyst.render_report(tx, &breakdown));
        } else {
            let report = analyst.analyze(tx);
            println!("{}", report.text());
        }

        // Ground truth is shown for evaluation only; the scoring path
        // never reads it.
        if let Some(is_fraud) = tx.is_fraud {
            println!();
            println!(
                "Ground truth: {}",
                if is_fraud { "FRAUD" } else { "LEGITIMATE" }
            );
        }
    }

    Ok(())
}

fn pick_start_index(
    store: &TransactionStore,
    index: Option<usize>,
    pick_random: bool,
    pick_fraud: bool,
    seed: u64,
) -> Result<usize> {
    if let Some(i) = index {
        if i >= store.len() {
            anyhow::bail!("--index {i} out of range (dataset has {} rows)", store.len());
        }
        return Ok(i);
    }

    let mut rng = SamplerRng::new(seed);
    if pick_fraud {
        let fraud_rows: Vec<usize> = store
            .all_records()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_fraud)
            .map(|(i, _)| i)
            .collect();
        if fraud_rows.is_empty() {
            anyhow::bail!("No ground-truth fraud rows in the loaded sample");
        }
        let pick = rng.next_u64_below(fraud_rows.len() as u64) as usize;
        return Ok(fraud_rows[pick]);
    }

    if pick_random {
        return Ok(rng.next_u64_below(store.len() as u64) as usize);
    }

    log::debug!("no selection flag given, starting at row 0");
    Ok(0)
}

fn print_info(config: &DataConfig) -> Result<()> {
    let info = store::dataset_info(config)?;
    println!("PayWatch dataset information");
    println!("  form:        {:?}", info.form);
    println!("  total rows:  {}", info.total_rows);
    println!("  fraud cases: {}", info.fraud_count);
    println!("  fraud rate:  {:.3}%", info.fraud_rate_pct());
    println!("  types:");
    for (tx_type, count) in &info.type_counts {
        println!("    {:<9} {count}", tx_type.as_str());
    }
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}

fn epoch_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
