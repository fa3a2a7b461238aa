mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Args, Commands};
use labelcheck_rs::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit status when no report could be produced.
const EXIT_ANALYSIS_FAILED: i32 = 2;

struct EvaluateArgs {
  rules: PathBuf,
  scene: PathBuf,
  sensitivity: Option<i64>,
  mm_per_px: Option<f64>,
  dpi: Option<f64>,
  config: Option<PathBuf>,
  output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
  let args = Args::parse();
  init_tracing(args.verbose);

  match args.command {
    Commands::Version => {
      println!("labelcheck {}", env!("CARGO_PKG_VERSION"));
    }
    Commands::Evaluate {
      rules,
      scene,
      sensitivity,
      mm_per_px,
      dpi,
      config,
      output,
    } => {
      let evaluate = EvaluateArgs {
        rules,
        scene,
        sensitivity,
        mm_per_px,
        dpi,
        config,
        output,
      };
      if let Err(e) = run_evaluate(evaluate).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(EXIT_ANALYSIS_FAILED);
      }
    }
  }
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
  let contents = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("Failed to read {} file {}", what, path.display()))?;
  serde_json::from_str(&contents).with_context(|| format!("Failed to parse {} file {}", what, path.display()))
}

async fn run_evaluate(args: EvaluateArgs) -> Result<()> {
  let options = match &args.config {
    Some(path) => VerifierOptions::from_file(path)?,
    None => VerifierOptions::default(),
  };
  let sensitivity = match args.sensitivity {
    Some(value) => Sensitivity::new(value)?,
    None => options.default_sensitivity,
  };

  let rules: RuleDocument = read_json(&args.rules, "rule").await?;
  let rules = rules.into_rules();
  let SceneDocument {
    mut scene,
    calibration_references,
  } = read_json(&args.scene, "scene").await?;

  if let Some(dpi) = args.dpi {
    if !(dpi.is_finite() && dpi > 0.0) {
      bail!("--dpi must be a positive number, got {}", dpi);
    }
    scene.image.dpi = Some(Dpi::uniform(dpi));
  }

  let calibration = match args.mm_per_px {
    Some(ratio) => Some(
      CalibrationRatio::isotropic(ratio)
        .with_context(|| format!("--mm-per-px must be a positive number, got {}", ratio))?,
    ),
    None => resolve_calibration(&scene.visual_features, &scene.image, &calibration_references),
  };

  let verifier = Verifier::new(options)?;
  let report = tokio::task::spawn_blocking(move || verifier.evaluate(&rules, &scene, calibration, sensitivity))
    .await
    .context("Rule evaluation task failed")??;

  let json = report.to_json().context("Failed to serialize report")?;
  match &args.output {
    Some(path) => {
      tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
      info!(path = %path.display(), status = ?report.overall_status, "report written");
    }
    None => println!("{}", json),
  }
  Ok(())
}
