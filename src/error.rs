//! Domain error types.
//!
//! The application layer wraps these in `anyhow` with context; the
//! analysis layer matches on them to turn statistical degeneracies into
//! "undefined" results instead of aborting a run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the study's input files.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// The input file could not be opened.
    #[error("cannot open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The underlying CSV reader or writer failed.
    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        /// File being read or written.
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// An evaluation file is not valid JSON of the expected shape.
    #[error("invalid evaluation file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A column the loader relies on is not present in the header.
    #[error("missing column `{column}` in {}", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// A platform cell held something other than `Desktop` or `Mobile`.
    #[error("unknown platform `{value}` on line {line} of {}", .path.display())]
    UnknownPlatform {
        path: PathBuf,
        line: u64,
        value: String,
    },
}

/// Reasons a kappa statistic cannot be computed for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KappaError {
    /// No site group qualified, so there is nothing to compare.
    #[error("no qualifying site groups")]
    EmptyTable,

    /// Chance agreement equals 1, so the denominator vanishes.
    #[error("chance agreement is 1 (every rating falls in a single category)")]
    DegenerateChance,

    /// Fewer than two raters per item.
    #[error("at least two raters per item are required, got {0}")]
    TooFewRaters(usize),

    /// A contingency row does not hold one rating per rater.
    #[error("contingency row sums to {found}, expected {expected}")]
    RowSum { expected: usize, found: usize },
}

/// Invalid rater roster or other configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rater pair must name two different annotators, got `{0}` twice")]
    DuplicatePair(String),

    #[error("rater `{0}` is both in the pair and in the excluded list")]
    PairExcluded(String),

    #[error("rater names must not be empty")]
    EmptyRaterName,

    #[error("no questions configured")]
    NoQuestions,

    #[error("unknown question `{0}`")]
    UnknownQuestion(String),
}
