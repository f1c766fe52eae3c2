use anyhow::{Context, Result, bail};
use eval::{BenchmarkConfig, BenchmarkResult, Benchmarker, ExpectedData, HistoryStore, HistorySummary};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((expected_path, response_paths)) = args.split_first() else {
        bail!("Usage: run_benchmark <expected.json> <response.txt>...");
    };
    if response_paths.is_empty() {
        bail!("No response files given");
    }

    let config_path = std::env::var("BENCHMARK_CONFIG").unwrap_or_else(|_| "benchmark.json".to_string());
    let config = BenchmarkConfig::load(Path::new(&config_path)).await?;

    println!("=== Extraction Benchmark ===\n");
    println!("Model: {} (prompt {})", config.model_name, config.prompt_version);
    println!("Mode: {:?}", config.mode);

    let expected = ExpectedData::load(Path::new(expected_path)).await?;
    let responses = read_responses(response_paths).await?;
    println!("Responses: {}\n", responses.len());

    let target_f1 = config.target_f1;
    let history = HistoryStore::new(config.history_path.clone());
    let benchmarker = Benchmarker::new(config, expected);
    let result = benchmarker.run(&responses);

    print_results(&result, target_f1);

    let runs = history.append(&result).await?;
    println!("\n✅ Run saved to {} ({} runs)", history.path().display(), runs);

    print_history(&history.summary().await?);

    Ok(())
}

async fn read_responses(paths: &[String]) -> Result<Vec<String>> {
    let mut responses = Vec::with_capacity(paths.len());
    for path in paths.iter().map(PathBuf::from) {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read response: {}", path.display()))?;
        responses.push(content);
    }
    Ok(responses)
}

fn print_results(result: &BenchmarkResult, target_f1: f64) {
    println!("\n=== RESULTS ===\n");

    println!("📊 CHARACTERS:");
    println!("  Extracted: {}", result.extracted_characters.len());
    println!("  Expected: {}", result.expected_characters.len());
    println!("  {}", result.character_metrics);

    println!("\n📊 DIALOGS:");
    println!("  Extracted: {}", result.extracted_dialogs.len());
    println!("  Expected: {}", result.expected_dialogs.len());
    println!("  {}", result.dialog_metrics);

    println!("\n⏱  TIMING:");
    for (stage, ms) in &result.timing_ms {
        println!("  {}: {:.2} ms", stage, ms);
    }

    let verdict = if result.meets_target(target_f1) { "PASS" } else { "FAIL" };
    println!("\n🏆 {} (target F1 {:.0}%)", verdict, target_f1 * 100.0);
}

fn print_history(summary: &HistorySummary) {
    println!("\n📈 HISTORY ({} runs):", summary.runs);
    println!(
        "  Character F1: {:.2}% ± {:.2}",
        summary.character_f1_mean * 100.0,
        summary.character_f1_stdev * 100.0
    );
    println!(
        "  Dialog F1: {:.2}% ± {:.2}",
        summary.dialog_f1_mean * 100.0,
        summary.dialog_f1_stdev * 100.0
    );
}
