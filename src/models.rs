//! Data models for the study analyses.
//!
//! This module contains the typed survey vocabulary (questions, Likert
//! levels, platforms), the rating records built from the annotation
//! export, and the result structures that reports are rendered from.

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Platform a site was evaluated on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Platform {
    Desktop,
    Mobile,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Desktop => write!(f, "Desktop"),
            Platform::Mobile => write!(f, "Mobile"),
        }
    }
}

impl Platform {
    /// Parse the platform label used in the survey export.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "Desktop" => Some(Platform::Desktop),
            "Mobile" => Some(Platform::Mobile),
            _ => None,
        }
    }
}

/// Quick exit mechanism under test.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Mechanism {
    Button,
    Shortcut,
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mechanism::Button => write!(f, "Button"),
            Mechanism::Shortcut => write!(f, "Shortcut"),
        }
    }
}

/// A Likert-scale survey question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Question {
    ButtonDiscover,
    ButtonDistinct,
    ShortcutDiscover,
    ShortcutIntuitive,
    TextDiscover,
    TextComprehend,
    SafetyDiscover,
}

impl Question {
    /// Every question, in survey order.
    pub const ALL: [Question; 7] = [
        Question::ButtonDiscover,
        Question::ButtonDistinct,
        Question::ShortcutDiscover,
        Question::ShortcutIntuitive,
        Question::TextDiscover,
        Question::TextComprehend,
        Question::SafetyDiscover,
    ];

    /// Column label in the survey export.
    pub fn label(&self) -> &'static str {
        match self {
            Question::ButtonDiscover => "button-discover",
            Question::ButtonDistinct => "button-distinct",
            Question::ShortcutDiscover => "shortcut-discover",
            Question::ShortcutIntuitive => "shortcut-intuitive",
            Question::TextDiscover => "text-discover",
            Question::TextComprehend => "text-comprehend",
            Question::SafetyDiscover => "safety-discover",
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Question {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Question::ALL
            .into_iter()
            .find(|q| q.label() == s.trim())
            .ok_or_else(|| ConfigError::UnknownQuestion(s.to_string()))
    }
}

/// The five-level agreement scale, ordered from disagree to agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Likert {
    StronglyDisagree,
    SomewhatDisagree,
    Neither,
    SomewhatAgree,
    StronglyAgree,
}

impl Likert {
    /// Number of scale levels (columns of a contingency row).
    pub const LEVELS: usize = 5;

    pub const ALL: [Likert; Likert::LEVELS] = [
        Likert::StronglyDisagree,
        Likert::SomewhatDisagree,
        Likert::Neither,
        Likert::SomewhatAgree,
        Likert::StronglyAgree,
    ];

    /// Label as written in the survey export.
    pub fn label(&self) -> &'static str {
        match self {
            Likert::StronglyDisagree => "Strongly disagree",
            Likert::SomewhatDisagree => "Somewhat disagree",
            Likert::Neither => "Neither agree nor disagree",
            Likert::SomewhatAgree => "Somewhat agree",
            Likert::StronglyAgree => "Strongly agree",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Likert::ALL.into_iter().find(|l| l.label() == s)
    }

    /// Column index in a contingency row.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Numeric score from -2 (strongly disagree) to 2 (strongly agree).
    pub fn score(&self) -> i32 {
        self.index() as i32 - 2
    }
}

impl fmt::Display for Likert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One annotator's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Response {
    /// Empty cell.
    Unanswered,
    /// A level on the agreement scale.
    Likert(Likert),
    /// Answered with something off the scale, e.g. "Not applicable".
    Other(String),
}

static UNANSWERED: Response = Response::Unanswered;

impl Response {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            Response::Unanswered
        } else if let Some(level) = Likert::from_label(raw) {
            Response::Likert(level)
        } else {
            Response::Other(raw.to_string())
        }
    }

    pub fn is_answered(&self) -> bool {
        !matches!(self, Response::Unanswered)
    }

    pub fn likert(&self) -> Option<Likert> {
        match self {
            Response::Likert(level) => Some(*level),
            _ => None,
        }
    }

    /// Numeric score; anything off the scale counts as neutral.
    pub fn score(&self) -> i32 {
        self.likert().map(|l| l.score()).unwrap_or(0)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Unanswered => Ok(()),
            Response::Likert(level) => write!(f, "{}", level),
            Response::Other(s) => f.write_str(s),
        }
    }
}

/// Timed usability tasks recorded by the evaluation harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingTest {
    LearnButton,
    RecallButton,
    LearnShortcut,
    RecallShortcut,
    LearnExplainer,
    RecallExplainer,
}

impl TimingTest {
    pub const ALL: [TimingTest; 6] = [
        TimingTest::LearnButton,
        TimingTest::RecallButton,
        TimingTest::LearnShortcut,
        TimingTest::RecallShortcut,
        TimingTest::LearnExplainer,
        TimingTest::RecallExplainer,
    ];

    /// Field name in the evaluation files and column name in the dataset.
    pub fn label(&self) -> &'static str {
        match self {
            TimingTest::LearnButton => "learn_button_time",
            TimingTest::RecallButton => "recall_button_time",
            TimingTest::LearnShortcut => "learn_shortcut_time",
            TimingTest::RecallShortcut => "recall_shortcut_time",
            TimingTest::LearnExplainer => "learn_explainer_time",
            TimingTest::RecallExplainer => "recall_explainer_time",
        }
    }
}

/// Identity of a site group: the evaluated URL on one platform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteKey {
    pub site: String,
    pub platform: Platform,
}

impl SiteKey {
    pub fn new(site: impl Into<String>, platform: Platform) -> Self {
        Self {
            site: site.into(),
            platform,
        }
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.site, self.platform)
    }
}

/// One annotator's survey submission for one site group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub key: SiteKey,
    pub annotator: String,
    /// Only questions whose column exists in the source appear here.
    pub responses: BTreeMap<Question, Response>,
}

impl RatingRecord {
    pub fn new(key: SiteKey, annotator: impl Into<String>) -> Self {
        Self {
            key,
            annotator: annotator.into(),
            responses: BTreeMap::new(),
        }
    }

    /// Builder-style helper to set one answer.
    #[cfg(test)]
    pub fn with_response(mut self, question: Question, response: Response) -> Self {
        self.responses.insert(question, response);
        self
    }

    /// The answer to `question`, `Unanswered` when absent.
    pub fn response(&self, question: Question) -> &Response {
        self.responses.get(&question).unwrap_or(&UNANSWERED)
    }
}

/// Which annotators take part in which agreement statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaterRoster {
    first: String,
    second: String,
    excluded: Vec<String>,
}

impl RaterRoster {
    /// Build a roster, rejecting duplicate or contradictory names.
    pub fn new(
        first: impl Into<String>,
        second: impl Into<String>,
        excluded: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let first = first.into();
        let second = second.into();

        if first.trim().is_empty() || second.trim().is_empty() {
            return Err(ConfigError::EmptyRaterName);
        }
        if first == second {
            return Err(ConfigError::DuplicatePair(first));
        }
        for name in [&first, &second] {
            if excluded.contains(name) {
                return Err(ConfigError::PairExcluded(name.clone()));
            }
        }

        Ok(Self {
            first,
            second,
            excluded,
        })
    }

    /// The designated pair: gates Fleiss rows and feeds Cohen's Kappa.
    pub fn pair(&self) -> (&str, &str) {
        (&self.first, &self.second)
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn is_excluded(&self, annotator: &str) -> bool {
        self.excluded.iter().any(|e| e == annotator)
    }
}

/// Landis & Koch interpretation bands for kappa values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementLevel {
    Poor,
    Slight,
    Fair,
    Moderate,
    Substantial,
    AlmostPerfect,
}

impl AgreementLevel {
    pub fn from_kappa(kappa: f64) -> Self {
        if kappa < 0.0 {
            AgreementLevel::Poor
        } else if kappa <= 0.20 {
            AgreementLevel::Slight
        } else if kappa <= 0.40 {
            AgreementLevel::Fair
        } else if kappa <= 0.60 {
            AgreementLevel::Moderate
        } else if kappa <= 0.80 {
            AgreementLevel::Substantial
        } else {
            AgreementLevel::AlmostPerfect
        }
    }
}

impl fmt::Display for AgreementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgreementLevel::Poor => write!(f, "Poor"),
            AgreementLevel::Slight => write!(f, "Slight"),
            AgreementLevel::Fair => write!(f, "Fair"),
            AgreementLevel::Moderate => write!(f, "Moderate"),
            AgreementLevel::Substantial => write!(f, "Substantial"),
            AgreementLevel::AlmostPerfect => write!(f, "Almost perfect"),
        }
    }
}

/// Agreement statistics for a single question.
///
/// `None` means the statistic is undefined for this question; the
/// matching `*_note` carries the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAgreement {
    pub question: Question,
    pub fleiss: Option<f64>,
    pub cohen: Option<f64>,
    /// Site groups where both designated raters answered.
    pub qualifying_groups: usize,
    /// Qualifying groups with an on-scale answer from every panel member.
    pub fleiss_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleiss_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohen_note: Option<String>,
}

/// Metadata about an agreement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementMetadata {
    /// Survey export the ratings were read from.
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub rater_pair: (String, String),
    pub excluded_raters: Vec<String>,
    /// Annotators counted in the Fleiss table.
    pub fleiss_panel: Vec<String>,
    pub site_groups: usize,
    pub records: usize,
}

/// The complete agreement report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementReport {
    pub metadata: AgreementMetadata,
    pub questions: Vec<QuestionAgreement>,
}

/// Colour band of a Pearson residual, from strongly under- to strongly
/// over-represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualBand {
    StrongUnder,
    Under,
    SlightUnder,
    Neutral,
    SlightOver,
    Over,
    StrongOver,
}

impl ResidualBand {
    pub fn from_residual(r: f64) -> Self {
        if r > 4.0 {
            ResidualBand::StrongOver
        } else if r > 2.0 {
            ResidualBand::Over
        } else if r > 0.5 {
            ResidualBand::SlightOver
        } else if r < -4.0 {
            ResidualBand::StrongUnder
        } else if r < -2.0 {
            ResidualBand::Under
        } else if r < -0.5 {
            ResidualBand::SlightUnder
        } else {
            ResidualBand::Neutral
        }
    }

    /// Returns an emoji marker for the band.
    pub fn emoji(&self) -> &'static str {
        match self {
            ResidualBand::StrongOver => "🔴",
            ResidualBand::Over => "🟠",
            ResidualBand::SlightOver => "🟡",
            ResidualBand::Neutral => "⚪",
            ResidualBand::SlightUnder => "🔵",
            ResidualBand::Under => "🟦",
            ResidualBand::StrongUnder => "🟣",
        }
    }
}

/// One region x category cell of a chi-squared test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellResidual {
    pub region: String,
    pub category: String,
    pub sites: usize,
    pub observed: usize,
    pub expected: f64,
    pub residual: f64,
    pub band: ResidualBand,
}

/// Result of a chi-squared test of mechanism presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificanceResult {
    pub platform: Platform,
    pub mechanism: Mechanism,
    pub collapsed: bool,
    pub chi2: f64,
    pub dof: usize,
    pub p_value: f64,
    /// Sites where the mechanism is present.
    pub present: usize,
    /// Denominator of the presence likelihood.
    pub population: usize,
    pub cells: Vec<CellResidual>,
}

/// The complete significance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificanceReport {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub result: SignificanceResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_likert_ordering_and_scores() {
        assert!(Likert::StronglyDisagree < Likert::StronglyAgree);
        assert_eq!(Likert::StronglyDisagree.index(), 0);
        assert_eq!(Likert::StronglyAgree.index(), 4);
        assert_eq!(Likert::StronglyAgree.score(), 2);
        assert_eq!(Likert::SomewhatAgree.score(), 1);
        assert_eq!(Likert::Neither.score(), 0);
        assert_eq!(Likert::SomewhatDisagree.score(), -1);
        assert_eq!(Likert::StronglyDisagree.score(), -2);
    }

    #[test]
    fn test_response_parse() {
        assert_eq!(Response::parse(""), Response::Unanswered);
        assert_eq!(Response::parse("   "), Response::Unanswered);
        assert_eq!(
            Response::parse("Somewhat agree"),
            Response::Likert(Likert::SomewhatAgree)
        );
        assert_eq!(
            Response::parse("Not applicable"),
            Response::Other("Not applicable".to_string())
        );
        assert!(Response::parse("Not applicable").is_answered());
        assert_eq!(Response::parse("Not applicable").score(), 0);
    }

    #[test]
    fn test_question_from_str() {
        assert_eq!(
            "shortcut-intuitive".parse::<Question>().unwrap(),
            Question::ShortcutIntuitive
        );
        assert!("button-colour".parse::<Question>().is_err());
        for q in Question::ALL {
            assert_eq!(q.label().parse::<Question>().unwrap(), q);
        }
    }

    #[test]
    fn test_question_serde_matches_label() {
        let json = serde_json::to_string(&Question::TextComprehend).unwrap();
        assert_eq!(json, "\"text-comprehend\"");
    }

    #[test]
    fn test_missing_response_is_unanswered() {
        let record = RatingRecord::new(SiteKey::new("https://a.org", Platform::Desktop), "Alice")
            .with_response(Question::ButtonDiscover, Response::Likert(Likert::Neither));
        assert_eq!(
            record.response(Question::ButtonDiscover),
            &Response::Likert(Likert::Neither)
        );
        assert_eq!(record.response(Question::SafetyDiscover), &Response::Unanswered);
    }

    #[test]
    fn test_roster_validation() {
        assert!(RaterRoster::new("Alice", "Bob", vec!["Carol".to_string()]).is_ok());
        assert!(matches!(
            RaterRoster::new("Alice", "Alice", vec![]),
            Err(ConfigError::DuplicatePair(_))
        ));
        assert!(matches!(
            RaterRoster::new("Alice", "Bob", vec!["Bob".to_string()]),
            Err(ConfigError::PairExcluded(_))
        ));
        assert!(matches!(
            RaterRoster::new("", "Bob", vec![]),
            Err(ConfigError::EmptyRaterName)
        ));
    }

    #[test]
    fn test_agreement_level_bands() {
        assert_eq!(AgreementLevel::from_kappa(-0.1), AgreementLevel::Poor);
        assert_eq!(AgreementLevel::from_kappa(0.1), AgreementLevel::Slight);
        assert_eq!(AgreementLevel::from_kappa(0.3), AgreementLevel::Fair);
        assert_eq!(AgreementLevel::from_kappa(0.5), AgreementLevel::Moderate);
        assert_eq!(AgreementLevel::from_kappa(0.7), AgreementLevel::Substantial);
        assert_eq!(AgreementLevel::from_kappa(1.0), AgreementLevel::AlmostPerfect);
    }

    #[test]
    fn test_residual_bands() {
        assert_eq!(ResidualBand::from_residual(5.0), ResidualBand::StrongOver);
        assert_eq!(ResidualBand::from_residual(3.0), ResidualBand::Over);
        assert_eq!(ResidualBand::from_residual(1.0), ResidualBand::SlightOver);
        assert_eq!(ResidualBand::from_residual(0.0), ResidualBand::Neutral);
        assert_eq!(ResidualBand::from_residual(-1.0), ResidualBand::SlightUnder);
        assert_eq!(ResidualBand::from_residual(-3.0), ResidualBand::Under);
        assert_eq!(ResidualBand::from_residual(-5.0), ResidualBand::StrongUnder);
    }
}
