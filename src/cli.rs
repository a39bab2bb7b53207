//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{Mechanism, Platform};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// quickexit-stats - analyses for the quick exit usability study
///
/// Computes inter-rater agreement on the annotation survey, mean Likert
/// scores per site, and chi-squared tests of mechanism presence.
///
/// Examples:
///   quickexit-stats agreement --annotations exit_button_annotations.csv
///   quickexit-stats agreement -a annotations.csv --format json -o kappas.json
///   quickexit-stats scores -a annotations.csv -o site_scores.csv
///   quickexit-stats scores -a annotations.csv --site-info site_info.csv --timings evaluation1.json,evaluation2.json
///   quickexit-stats significance --sites sitelist.csv --platform mobile --mechanism button --collapsed
///   quickexit-stats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .quickexit.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The two raters compared by Cohen's Kappa (comma-separated)
    ///
    /// Example: --raters "Alice,Kieron Ivy"
    #[arg(long, value_name = "NAMES", value_delimiter = ',', global = true)]
    pub raters: Option<Vec<String>>,

    /// Raters left out of the Fleiss counts (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',', global = true)]
    pub exclude_raters: Option<Vec<String>>,

    /// Questions to analyze (comma-separated column labels)
    ///
    /// Example: --questions button-discover,button-distinct
    #[arg(long, value_name = "QUESTIONS", value_delimiter = ',', global = true)]
    pub questions: Option<Vec<String>>,

    /// Decimal places for statistics in Markdown reports
    #[arg(long, value_name = "DIGITS", global = true)]
    pub precision: Option<usize>,

    /// Generate a default .quickexit.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fleiss' and Cohen's Kappa for every survey question
    Agreement {
        /// Survey export (CSV)
        #[arg(short, long, value_name = "FILE")]
        annotations: PathBuf,

        /// Output file path for the report [default: agreement_report.md]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (markdown, json) [default: markdown]
        #[arg(long, value_name = "FORMAT")]
        format: Option<OutputFormat>,
    },

    /// Mean Likert score per site group and question
    Scores {
        /// Survey export (CSV)
        #[arg(short, long, value_name = "FILE")]
        annotations: PathBuf,

        /// Output CSV path
        #[arg(short, long, default_value = "site_scores.csv", value_name = "FILE")]
        output: PathBuf,

        /// Site info sheet (CSV); writes the combined per-site dataset
        #[arg(long, value_name = "FILE")]
        site_info: Option<PathBuf>,

        /// Evaluation timing files (JSON, comma-separated); needs --site-info
        #[arg(long, value_name = "FILES", value_delimiter = ',')]
        timings: Vec<PathBuf>,
    },

    /// Chi-squared test of mechanism presence across region x category
    Significance {
        /// Site list (CSV)
        #[arg(short, long, value_name = "FILE")]
        sites: PathBuf,

        /// Platform to test
        #[arg(long, value_name = "PLATFORM")]
        platform: Platform,

        /// Mechanism to test
        #[arg(long, value_name = "MECHANISM")]
        mechanism: Mechanism,

        /// Use collapsed category groups
        #[arg(long)]
        collapsed: bool,

        /// Output file path for the report [default: significance_report.md]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (markdown, json) [default: markdown]
        #[arg(long, value_name = "FORMAT")]
        format: Option<OutputFormat>,
    },
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A subcommand is required (agreement, scores, significance)".to_string());
        };

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref raters) = self.raters {
            if raters.len() != 2 {
                return Err(format!(
                    "--raters takes exactly two names, got {}",
                    raters.len()
                ));
            }
        }

        if let Some(precision) = self.precision {
            if precision > 12 {
                return Err("Precision must be at most 12 digits".to_string());
            }
        }

        match command {
            Command::Agreement { annotations, .. } => check_input(annotations),
            Command::Scores {
                annotations,
                site_info,
                timings,
                ..
            } => {
                if site_info.is_none() && !timings.is_empty() {
                    return Err("--timings requires --site-info".to_string());
                }
                check_input(annotations)?;
                site_info.iter().chain(timings).try_for_each(|p| check_input(p))
            }
            Command::Significance { sites, .. } => check_input(sites),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn check_input(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("Input file does not exist: {}", path.display()));
    }
    if !path.is_file() {
        return Err(format!("Input path is not a file: {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Option<Command>) -> Args {
        Args {
            command,
            config: None,
            verbose: false,
            quiet: false,
            raters: None,
            exclude_raters: None,
            questions: None,
            precision: None,
            init_config: false,
        }
    }

    fn agreement_on(path: &Path) -> Command {
        Command::Agreement {
            annotations: path.to_path_buf(),
            output: Some(PathBuf::from("out.md")),
            format: None,
        }
    }

    #[test]
    fn test_parse_agreement() {
        let args = Args::try_parse_from([
            "quickexit-stats",
            "agreement",
            "-a",
            "annotations.csv",
            "--format",
            "json",
            "--raters",
            "Alice,Kieron Ivy",
        ])
        .unwrap();

        assert_eq!(
            args.raters,
            Some(vec!["Alice".to_string(), "Kieron Ivy".to_string()])
        );
        match args.command {
            Some(Command::Agreement {
                annotations,
                output,
                format,
            }) => {
                assert_eq!(annotations, PathBuf::from("annotations.csv"));
                assert_eq!(output, None);
                assert_eq!(format, Some(OutputFormat::Json));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_significance() {
        let args = Args::try_parse_from([
            "quickexit-stats",
            "significance",
            "--sites",
            "sitelist.csv",
            "--platform",
            "mobile",
            "--mechanism",
            "shortcut",
            "--collapsed",
        ])
        .unwrap();

        match args.command {
            Some(Command::Significance {
                platform,
                mechanism,
                collapsed,
                ..
            }) => {
                assert_eq!(platform, Platform::Mobile);
                assert_eq!(mechanism, Mechanism::Shortcut);
                assert!(collapsed);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validation_requires_command() {
        assert!(make_args(None).validate().is_err());

        let mut args = make_args(None);
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let args = make_args(Some(agreement_on(Path::new("/definitely/not/here.csv"))));
        assert!(args.validate().unwrap_err().contains("does not exist"));
    }

    #[test]
    fn test_validation_rater_count_and_conflicts() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let mut args = make_args(Some(agreement_on(file.path())));
        assert!(args.validate().is_ok());

        args.raters = Some(vec!["Alice".to_string()]);
        assert!(args.validate().is_err());

        args.raters = None;
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_scores_with_dataset_inputs() {
        let args = Args::try_parse_from([
            "quickexit-stats",
            "scores",
            "-a",
            "annotations.csv",
            "--site-info",
            "site_info.csv",
            "--timings",
            "evaluation1.json,evaluation2.json",
        ])
        .unwrap();

        match args.command {
            Some(Command::Scores {
                output,
                site_info,
                timings,
                ..
            }) => {
                assert_eq!(output, PathBuf::from("site_scores.csv"));
                assert_eq!(site_info, Some(PathBuf::from("site_info.csv")));
                assert_eq!(
                    timings,
                    vec![PathBuf::from("evaluation1.json"), PathBuf::from("evaluation2.json")]
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validation_timings_need_site_info() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let scores = |site_info: Option<PathBuf>| Command::Scores {
            annotations: file.path().to_path_buf(),
            output: PathBuf::from("out.csv"),
            site_info,
            timings: vec![file.path().to_path_buf()],
        };

        let err = make_args(Some(scores(None))).validate().unwrap_err();
        assert!(err.contains("--site-info"));
        assert!(make_args(Some(scores(Some(file.path().to_path_buf()))))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(None);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
