//! Per-question agreement over a loaded survey.
//!
//! Turns site groups into Fleiss contingency rows and Cohen label pairs
//! according to a [`RaterRoster`], then hands them to [`super::kappa`].

use super::kappa::{cohen_kappa, fleiss_kappa, ContingencyRow};
use crate::error::KappaError;
use crate::models::{Likert, Question, QuestionAgreement, RaterRoster, RatingRecord, Response};
use crate::survey::Survey;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Computes Fleiss' and Cohen's Kappa for a survey.
pub struct AgreementCalculator<'a> {
    roster: &'a RaterRoster,
}

impl<'a> AgreementCalculator<'a> {
    pub fn new(roster: &'a RaterRoster) -> Self {
        Self { roster }
    }

    /// Agreement for every question, in the order given.
    pub fn compute(&self, survey: &Survey, questions: &[Question]) -> Vec<QuestionAgreement> {
        let panel = self.fleiss_panel(survey);
        debug!("Fleiss panel: {}", panel.join(", "));

        questions
            .iter()
            .map(|&q| self.agreement_with_panel(survey, q, &panel))
            .collect()
    }

    /// Agreement for a single question. Never fails: statistics that
    /// cannot be computed come back as `None` with a note.
    pub fn question_agreement(&self, survey: &Survey, question: Question) -> QuestionAgreement {
        self.agreement_with_panel(survey, question, &self.fleiss_panel(survey))
    }

    /// Annotators counted in the Fleiss table: the designated pair plus
    /// every other annotator in the survey who is not excluded.
    pub fn fleiss_panel(&self, survey: &Survey) -> Vec<String> {
        let (first, second) = self.roster.pair();
        let mut panel: BTreeSet<&str> = [first, second].into_iter().collect();

        for (_, records) in survey.groups() {
            for record in records {
                if !self.roster.is_excluded(&record.annotator) {
                    panel.insert(record.annotator.as_str());
                }
            }
        }

        panel.into_iter().map(String::from).collect()
    }

    /// One row per qualifying site group in which every panel member gave
    /// an on-scale answer. Each member contributes exactly one rating, so
    /// every row sums to the panel size.
    pub fn contingency_rows(&self, survey: &Survey, question: Question) -> Vec<ContingencyRow> {
        self.rows_for_panel(survey, question, &self.fleiss_panel(survey))
    }

    fn agreement_with_panel(
        &self,
        survey: &Survey,
        question: Question,
        panel: &[String],
    ) -> QuestionAgreement {
        let rows = self.rows_for_panel(survey, question, panel);
        let pairs = self.rater_pairs(survey, question);
        debug!(
            "{}: {} contingency rows, {} rater pairs",
            question,
            rows.len(),
            pairs.len()
        );

        let (fleiss, fleiss_note) = settle(question, "Fleiss' Kappa", fleiss_kappa(&rows, panel.len()));
        let (cohen, cohen_note) = settle(question, "Cohen's Kappa", cohen_kappa(&pairs));

        QuestionAgreement {
            question,
            fleiss,
            cohen,
            qualifying_groups: pairs.len(),
            fleiss_rows: rows.len(),
            fleiss_note,
            cohen_note,
        }
    }

    fn rows_for_panel(
        &self,
        survey: &Survey,
        question: Question,
        panel: &[String],
    ) -> Vec<ContingencyRow> {
        survey
            .groups()
            .filter(|(_, records)| self.qualifies(records, question))
            .filter_map(|(key, records)| {
                let mut row = [0u32; Likert::LEVELS];
                for annotator in panel {
                    match answer_of(records, annotator, question).and_then(Response::likert) {
                        Some(level) => row[level.index()] += 1,
                        None => {
                            debug!(
                                "{}: {} has no on-scale answer from {}, left out of Fleiss",
                                question, key, annotator
                            );
                            return None;
                        }
                    }
                }
                Some(row)
            })
            .collect()
    }

    /// The designated pair's answers, one pair per qualifying site group.
    pub fn rater_pairs(&self, survey: &Survey, question: Question) -> Vec<(Response, Response)> {
        let (first, second) = self.roster.pair();

        survey
            .groups()
            .filter_map(|(key, records)| {
                let a = answer_of(records, first, question);
                let b = answer_of(records, second, question);
                match (a, b) {
                    (Some(a), Some(b)) => Some((a.clone(), b.clone())),
                    _ => {
                        debug!("{}: {} lacks a paired answer", question, key);
                        None
                    }
                }
            })
            .collect()
    }

    /// Both designated raters answered the question in this group.
    fn qualifies(&self, records: &[RatingRecord], question: Question) -> bool {
        let (first, second) = self.roster.pair();
        answered(records, first, question) && answered(records, second, question)
    }
}

fn answered(records: &[RatingRecord], annotator: &str, question: Question) -> bool {
    records
        .iter()
        .any(|r| r.annotator == annotator && r.response(question).is_answered())
}

/// A rater's answer within a group. Duplicate submissions resolve to the
/// lowest answer so the result does not depend on row order.
fn answer_of<'r>(records: &'r [RatingRecord], annotator: &str, question: Question) -> Option<&'r Response> {
    let mut answers = records
        .iter()
        .filter(|r| r.annotator == annotator)
        .map(|r| r.response(question))
        .filter(|resp| resp.is_answered());

    let first = answers.next()?;
    let rest: Vec<&Response> = answers.collect();
    if !rest.is_empty() {
        warn!(
            "{} submitted {} answers to {} for one site group; using the lowest",
            annotator,
            rest.len() + 1,
            question
        );
    }

    Some(rest.into_iter().fold(first, |lowest, r| lowest.min(r)))
}

fn settle(
    question: Question,
    statistic: &str,
    result: Result<f64, KappaError>,
) -> (Option<f64>, Option<String>) {
    match result {
        Ok(value) => (Some(value), None),
        Err(e) => {
            warn!("{}: {} undefined: {}", question, statistic, e);
            (None, Some(e.to_string()))
        }
    }
}
