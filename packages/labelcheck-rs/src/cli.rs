//! Command line arguments backing the `labelcheck` binary.
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "labelcheck",
  about = "Evaluate packaging label compliance rules against recognized label content",
  version
)]
pub struct Args {
  /// Enable debug logging on stderr
  #[arg(long, short = 'v', global = true)]
  pub verbose: bool,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// Evaluate a rule file against a scene file and print the analysis report
  #[command(group(ArgGroup::new("scale").args(["mm_per_px", "dpi"])))]
  Evaluate {
    /// JSON rule file: an array of rules or a rule set with `conditions`
    #[arg(long, short = 'r')]
    rules: PathBuf,

    /// JSON scene file with the image info, text regions and visual features
    #[arg(long, short = 's')]
    scene: PathBuf,

    /// Strictness from 0 (lenient) to 100 (strict); defaults to the configured value
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..=100))]
    sensitivity: Option<i64>,

    /// Millimeters per pixel, overriding any calibration reference
    #[arg(long)]
    mm_per_px: Option<f64>,

    /// Image resolution in dots per inch, overriding the scene metadata
    #[arg(long)]
    dpi: Option<f64>,

    /// JSON file with verifier options
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parses_evaluate() {
    let args = Args::parse_from([
      "labelcheck",
      "evaluate",
      "--rules",
      "rules.json",
      "--scene",
      "scene.json",
      "--sensitivity",
      "80",
      "--dpi",
      "300",
      "-v",
    ]);
    assert!(args.verbose);
    match args.command {
      Commands::Evaluate {
        rules,
        sensitivity,
        dpi,
        mm_per_px,
        ..
      } => {
        assert_eq!(rules, PathBuf::from("rules.json"));
        assert_eq!(sensitivity, Some(80));
        assert_eq!(dpi, Some(300.0));
        assert!(mm_per_px.is_none());
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_scale_flags_are_exclusive() {
    let result = Args::try_parse_from([
      "labelcheck", "evaluate", "-r", "r.json", "-s", "s.json", "--dpi", "300", "--mm-per-px", "0.1",
    ]);
    assert!(result.is_err());
  }

  #[test]
  fn test_sensitivity_range_is_enforced() {
    let result = Args::try_parse_from(["labelcheck", "evaluate", "-r", "r.json", "-s", "s.json", "--sensitivity", "101"]);
    assert!(result.is_err());
  }
}
