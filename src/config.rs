//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.quickexit.toml` files.

use crate::cli::{Command, OutputFormat};
use crate::error::ConfigError;
use crate::models::{Question, RaterRoster};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".quickexit.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Annotator roster.
    #[serde(default)]
    pub raters: RatersConfig,

    /// Survey settings.
    #[serde(default)]
    pub survey: SurveyConfig,

    /// Presence test settings.
    #[serde(default)]
    pub significance: SignificanceConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Which annotators feed which statistic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatersConfig {
    /// The two raters compared by Cohen's Kappa; both must answer for a
    /// site group to enter the Fleiss table.
    #[serde(default = "default_pair")]
    pub pair: [String; 2],

    /// Raters whose answers are left out of the Fleiss counts.
    #[serde(default = "default_excluded")]
    pub excluded: Vec<String>,
}

impl Default for RatersConfig {
    fn default() -> Self {
        Self {
            pair: default_pair(),
            excluded: default_excluded(),
        }
    }
}

fn default_pair() -> [String; 2] {
    ["Alice".to_string(), "Kieron Ivy".to_string()]
}

fn default_excluded() -> Vec<String> {
    vec!["Yanna".to_string()]
}

impl RatersConfig {
    pub fn roster(&self) -> Result<RaterRoster, ConfigError> {
        let [first, second] = &self.pair;
        RaterRoster::new(first.clone(), second.clone(), self.excluded.clone())
    }
}

/// Survey export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Question columns to analyze.
    #[serde(default = "default_questions")]
    pub questions: Vec<String>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
        }
    }
}

fn default_questions() -> Vec<String> {
    Question::ALL.iter().map(|q| q.label().to_string()).collect()
}

impl SurveyConfig {
    /// Parse the configured question labels.
    pub fn questions(&self) -> Result<Vec<Question>, ConfigError> {
        if self.questions.is_empty() {
            return Err(ConfigError::NoQuestions);
        }
        self.questions.iter().map(|q| q.parse()).collect()
    }
}

/// A named group of site categories for the collapsed test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Chi-squared presence test settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificanceConfig {
    /// Presence-rate denominator; defaults to the number of sites counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<usize>,

    /// Regions (table rows).
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,

    /// Site categories (table columns).
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Category groups used with `--collapsed`.
    #[serde(default = "default_collapsed")]
    pub collapsed: Vec<CategoryGroup>,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            population: None,
            regions: default_regions(),
            categories: default_categories(),
            collapsed: default_collapsed(),
        }
    }
}

fn default_regions() -> Vec<String> {
    vec!["UK", "Ireland", "Australia", "New Zealand", "USA", "Canada"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_categories() -> Vec<String> {
    vec![
        "Domestic Abuse",
        "Rape/SA",
        "LGBTQ+",
        "BAME(R)",
        "Sobreity",
        "Smoking",
        "Gambling",
        "Family Planning",
        "Parenting",
        "Children",
        "Homelessness",
        "Sexual health",
        "Mental Health",
        "Physical Health",
        "Disability",
        "Elderly",
        "Past offenders",
        "Victims",
        "Police",
        "Misc",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_collapsed() -> Vec<CategoryGroup> {
    let group = |name: &str, members: &[&str]| CategoryGroup {
        name: name.to_string(),
        members: members.iter().map(|m| m.to_string()).collect(),
    };

    vec![
        group("Gendered Violence", &["Domestic Abuse", "Rape/SA"]),
        group("Minorities", &["LGBTQ+", "BAME(R)"]),
        group("Addiction", &["Sobreity", "Smoking", "Gambling"]),
        group("Families", &["Family Planning", "Parenting", "Children"]),
        group(
            "Healthcare",
            &["Sexual health", "Mental Health", "Physical Health", "Disability"],
        ),
        group("Crime", &["Past offenders", "Victims", "Police"]),
        group("Misc", &[]),
    ]
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report format for `agreement` and `significance`.
    #[serde(default)]
    pub format: OutputFormat,

    /// Report path; each subcommand has its own default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Decimal places for statistics in Markdown output.
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// Only list residual cells outside the neutral band.
    #[serde(default = "default_true")]
    pub hide_neutral_cells: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            output: None,
            precision: default_precision(),
            hide_neutral_cells: true,
        }
    }
}

impl ReportConfig {
    /// The configured report path, or `fallback` when none is set.
    pub fn output_or(&self, fallback: &str) -> PathBuf {
        self.output.clone().unwrap_or_else(|| PathBuf::from(fallback))
    }
}

fn default_precision() -> usize {
    3
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.quickexit.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// where the CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref pair) = args.raters {
            if let [first, second] = pair.as_slice() {
                self.raters.pair = [first.clone(), second.clone()];
            }
        }
        if let Some(ref excluded) = args.exclude_raters {
            self.raters.excluded = excluded.clone();
        }
        if let Some(ref questions) = args.questions {
            self.survey.questions = questions.clone();
        }
        if let Some(precision) = args.precision {
            self.report.precision = precision;
        }

        // Report destination - only override if provided
        match args.command {
            Some(Command::Agreement {
                ref output, format, ..
            })
            | Some(Command::Significance {
                ref output, format, ..
            }) => {
                if let Some(format) = format {
                    self.report.format = format;
                }
                if let Some(ref output) = output {
                    self.report.output = Some(output.clone());
                }
            }
            _ => {}
        }
    }

    /// Check everything that can be checked before touching the data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.raters.roster()?;
        self.survey.questions()?;
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
