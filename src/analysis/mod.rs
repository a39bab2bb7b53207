//! Statistical analyses over the study data.
//!
//! - [`agreement`]: Fleiss' and Cohen's Kappa per survey question
//! - [`scores`]: mean Likert scores per site group
//! - [`dataset`]: site features, scores and timings joined per site
//! - [`significance`]: chi-squared presence test with residuals

pub mod agreement;
pub mod dataset;
pub mod distribution;
pub mod kappa;
pub mod scores;
pub mod significance;

pub use agreement::AgreementCalculator;
pub use dataset::{combine, write_dataset_csv};
pub use scores::{mean_scores, write_scores_csv};
pub use significance::{CategoryScheme, PresenceTest};
