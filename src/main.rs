use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use tracing::info;

use waav_live_tester::{
    GeminiLiveFactory, GoogleSpeechToText, GoogleTextToSpeech, MatrixRunner, MatrixSelection,
    Modality, Platform, ReportModel, TestMatrix, TesterConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlatformArg {
    Studio,
    Vertex,
    All,
}

impl PlatformArg {
    fn platforms(self) -> Vec<Platform> {
        match self {
            PlatformArg::Studio => vec![Platform::Studio],
            PlatformArg::Vertex => vec![Platform::Vertex],
            PlatformArg::All => Platform::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TestType {
    Text,
    Voice,
    Both,
}

impl TestType {
    fn modalities(self) -> Vec<Modality> {
        match self {
            TestType::Text => vec![Modality::Text],
            TestType::Voice => vec![Modality::Voice],
            TestType::Both => vec![Modality::Text, Modality::Voice],
        }
    }
}

/// WaaV Live Tester - conformance runs against Gemini Live models
#[derive(Parser, Debug)]
#[command(name = "waav-live-tester")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Platform to test
    #[arg(short = 'p', long = "platform", value_enum, default_value = "all")]
    platform: PlatformArg,

    /// Run a single declared model (requires a concrete platform)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Modalities to test
    #[arg(short = 't', long = "test-type", value_enum, default_value = "both")]
    test_type: TestType,

    /// Region override for every case (Vertex AI location)
    #[arg(short = 'r', long = "region")]
    region: Option<String>,

    /// Write the JSON report to this path
    #[arg(short = 'o', long = "report", value_name = "FILE")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Must be installed before the first TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    if cli.model.is_some() && cli.platform == PlatformArg::All {
        anyhow::bail!("--model requires --platform studio or --platform vertex");
    }

    let config = if let Some(config_path) = &cli.config {
        println!("Loading configuration from {}", config_path.display());
        TesterConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        TesterConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };
    let config = Arc::new(config);

    let selection = MatrixSelection {
        platforms: cli.platform.platforms(),
        model: cli.model.clone(),
        modalities: cli.test_type.modalities(),
        region: cli.region.clone(),
    };
    let matrix = TestMatrix::build(&config.models, &selection)?;
    if matrix.is_empty() {
        anyhow::bail!("No test cases selected");
    }

    let factory = Arc::new(GeminiLiveFactory::new(config.clone()));
    let transcriber = Arc::new(GoogleSpeechToText::new(&config)?);
    let synthesizer = Arc::new(GoogleTextToSpeech::new(&config)?);

    let mut runner =
        MatrixRunner::new(config.clone(), factory, transcriber).with_synthesizer(synthesizer);
    let report = runner.run(&matrix).await;

    print_report(&report);

    if let Some(path) = cli.report.as_ref().or(config.report.output_path.as_ref()) {
        report.write_json(path)?;
        println!("Report written to {}", path.display());
    }

    info!("Run {} complete", report.run_id);
    Ok(())
}

fn print_report(report: &ReportModel) {
    println!();
    for entry in report.entries() {
        let status = if entry.passed() {
            "PASS"
        } else if entry.expected_failure {
            "FAIL (expected)"
        } else {
            "FAIL"
        };
        let reason = entry
            .result
            .outcome
            .failure_reason
            .map(|r| format!(" [{r}]"))
            .unwrap_or_default();
        println!(
            "{:<60} {}{} attempts={} {}ms",
            entry.identity,
            status,
            reason,
            entry.result.attempts(),
            entry.result.duration_ms
        );
        if let Some(transcript) = &entry.result.outcome.transcript {
            println!("    response: {transcript}");
        }
    }

    let summary = report.summary();
    println!();
    println!(
        "{}/{} passed ({:.1}%)",
        summary.passed, summary.total, summary.success_rate
    );
    if summary.expected_failures > 0 {
        println!("{} expected failure(s)", summary.expected_failures);
    }
}
