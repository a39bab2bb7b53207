//! Markdown and JSON report generation.
//!
//! This module renders agreement and significance results into
//! Markdown documents, or serializes them as JSON.

use crate::models::{
    AgreementLevel, AgreementMetadata, AgreementReport, CellResidual, QuestionAgreement,
    ResidualBand, SignificanceReport, SignificanceResult,
};
use anyhow::Result;
use serde::Serialize;

/// Rendering options shared by the Markdown generators.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Decimal places for statistics.
    pub precision: usize,
    /// Leave neutral residual cells out of the significance table.
    pub hide_neutral_cells: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            precision: 3,
            hide_neutral_cells: true,
        }
    }
}

/// Format an optional statistic; `None` renders as "undefined".
pub fn format_stat(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "undefined".to_string(),
    }
}

/// Generate a complete agreement report in Markdown.
pub fn generate_agreement_markdown(report: &AgreementReport, options: RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# Inter-Rater Agreement Report\n\n");
    output.push_str(&generate_agreement_metadata(&report.metadata));
    output.push_str(&generate_agreement_table(&report.questions, options.precision));
    output.push_str(&generate_undefined_notes(&report.questions));
    output.push_str(&generate_interpretation_legend());
    output.push_str(&generate_footer());

    output
}

fn generate_agreement_metadata(metadata: &AgreementMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Rater Pair:** {} / {}\n",
        metadata.rater_pair.0, metadata.rater_pair.1
    ));
    section.push_str(&format!(
        "- **Fleiss Panel:** {} ({} raters per row)\n",
        metadata.fleiss_panel.join(", "),
        metadata.fleiss_panel.len()
    ));
    if !metadata.excluded_raters.is_empty() {
        section.push_str(&format!(
            "- **Excluded From Fleiss Counts:** {}\n",
            metadata.excluded_raters.join(", ")
        ));
    }
    section.push_str(&format!("- **Site Groups:** {}\n", metadata.site_groups));
    section.push_str(&format!("- **Submissions:** {}\n", metadata.records));
    section.push('\n');

    section
}

fn generate_agreement_table(questions: &[QuestionAgreement], precision: usize) -> String {
    let mut section = String::new();

    section.push_str("## Agreement by Question\n\n");
    section.push_str(
        "| Question | Groups | Fleiss Rows | Fleiss' Kappa | Level | Cohen's Kappa | Level |\n",
    );
    section.push_str("|:---|:---:|:---:|:---:|:---|:---:|:---|\n");

    for q in questions {
        section.push_str(&format!(
            "| `{}` | {} | {} | {} | {} | {} | {} |\n",
            q.question,
            q.qualifying_groups,
            q.fleiss_rows,
            format_stat(q.fleiss, precision),
            level_label(q.fleiss),
            format_stat(q.cohen, precision),
            level_label(q.cohen),
        ));
    }
    section.push('\n');

    section
}

fn level_label(value: Option<f64>) -> String {
    value
        .map(|v| AgreementLevel::from_kappa(v).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn generate_undefined_notes(questions: &[QuestionAgreement]) -> String {
    let notes: Vec<String> = questions
        .iter()
        .flat_map(|q| {
            let fleiss = q
                .fleiss_note
                .as_ref()
                .map(|n| format!("- `{}` Fleiss' Kappa: {}", q.question, n));
            let cohen = q
                .cohen_note
                .as_ref()
                .map(|n| format!("- `{}` Cohen's Kappa: {}", q.question, n));
            fleiss.into_iter().chain(cohen)
        })
        .collect();

    if notes.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("### Undefined Statistics\n\n");
    section.push_str(&notes.join("\n"));
    section.push_str("\n\n");
    section
}

fn generate_interpretation_legend() -> String {
    let mut section = String::new();

    section.push_str("### Interpretation\n\n");
    section.push_str("| Kappa | Level |\n");
    section.push_str("|:---|:---|\n");
    for (range, level) in [
        ("< 0", AgreementLevel::Poor),
        ("0.00 - 0.20", AgreementLevel::Slight),
        ("0.21 - 0.40", AgreementLevel::Fair),
        ("0.41 - 0.60", AgreementLevel::Moderate),
        ("0.61 - 0.80", AgreementLevel::Substantial),
        ("0.81 - 1.00", AgreementLevel::AlmostPerfect),
    ] {
        section.push_str(&format!("| {} | {} |\n", range, level));
    }
    section.push('\n');

    section
}

/// Generate a complete significance report in Markdown.
pub fn generate_significance_markdown(report: &SignificanceReport, options: RenderOptions) -> String {
    let mut output = String::new();
    let result = &report.result;

    output.push_str(&format!(
        "# Presence of {} {}\n\n",
        result.platform, result.mechanism
    ));

    output.push_str("## Metadata\n\n");
    output.push_str(&format!("- **Source:** `{}`\n", report.source));
    output.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!(
        "- **Categories:** {}\n\n",
        if result.collapsed { "collapsed" } else { "fine" }
    ));

    output.push_str(&generate_test_summary(result, options.precision));
    output.push_str(&generate_residual_table(
        &result.cells,
        options.precision,
        options.hide_neutral_cells,
    ));
    output.push_str(&generate_footer());

    output
}

fn generate_test_summary(result: &SignificanceResult, precision: usize) -> String {
    let mut section = String::new();

    section.push_str("## Chi-Squared Test\n\n");
    section.push_str("| Present | Population | χ² | dof | p |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {:.*} | {} | {:.*} |\n\n",
        result.present, result.population, precision, result.chi2, result.dof, precision, result.p_value
    ));

    section
}

fn generate_residual_table(cells: &[CellResidual], precision: usize, hide_neutral: bool) -> String {
    let mut section = String::new();

    section.push_str("## Residuals\n\n");

    let mut shown: Vec<&CellResidual> = cells
        .iter()
        .filter(|c| !hide_neutral || c.band != ResidualBand::Neutral)
        .collect();

    if shown.is_empty() {
        section.push_str("No cell deviates from the expected presence rate.\n\n");
        return section;
    }

    // Largest deviations first
    shown.sort_by(|a, b| b.residual.abs().total_cmp(&a.residual.abs()));

    section.push_str("| | Region | Category | Sites | Observed | Expected | Residual |\n");
    section.push_str("|:---:|:---|:---|:---:|:---:|:---:|:---:|\n");
    for cell in shown {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.*} | {:+.*} |\n",
            cell.band.emoji(),
            cell.region,
            cell.category,
            cell.sites,
            cell.observed,
            precision,
            cell.expected,
            precision,
            cell.residual,
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by quickexit-stats*\n".to_string()
}

/// Generate a JSON report for any serializable result.
pub fn generate_json_report<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
