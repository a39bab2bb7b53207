//! Inter-rater agreement statistics.
//!
//! Plain functions over already-assembled inputs: a contingency table
//! for Fleiss' Kappa and a list of paired labels for Cohen's Kappa.
//! Degenerate inputs come back as [`KappaError`] rather than NaN.

use crate::error::KappaError;
use crate::models::Likert;
use std::collections::BTreeMap;

/// Category counts for one item, indexed by [`Likert::index`].
pub type ContingencyRow = [u32; Likert::LEVELS];

/// Below this, `1 - p_e` is treated as zero.
const CHANCE_EPSILON: f64 = 1e-12;

/// Fleiss' Kappa over `rows`, each rated by `n_raters` raters.
///
/// Every row must sum to exactly `n_raters`; otherwise the per-row
/// agreement term leaves `[0, 1]` and kappa is meaningless.
pub fn fleiss_kappa(rows: &[ContingencyRow], n_raters: usize) -> Result<f64, KappaError> {
    if n_raters < 2 {
        return Err(KappaError::TooFewRaters(n_raters));
    }
    if rows.is_empty() {
        return Err(KappaError::EmptyTable);
    }
    if let Some(row) = rows
        .iter()
        .find(|row| row.iter().sum::<u32>() as usize != n_raters)
    {
        return Err(KappaError::RowSum {
            expected: n_raters,
            found: row.iter().sum::<u32>() as usize,
        });
    }

    let n = n_raters as f64;
    let items = rows.len() as f64;

    let mut column_totals = [0.0f64; Likert::LEVELS];
    let mut agreement_sum = 0.0;

    for row in rows {
        let mut squares = 0.0;
        for (total, &count) in column_totals.iter_mut().zip(row.iter()) {
            let count = f64::from(count);
            *total += count;
            squares += count * count;
        }
        agreement_sum += (squares - n) / (n * (n - 1.0));
    }

    let p_bar = agreement_sum / items;
    let p_bar_e: f64 = column_totals
        .iter()
        .map(|total| {
            let p = total / (items * n);
            p * p
        })
        .sum();

    if (1.0 - p_bar_e).abs() < CHANCE_EPSILON {
        return Err(KappaError::DegenerateChance);
    }

    Ok((p_bar - p_bar_e) / (1.0 - p_bar_e))
}

/// Unweighted Cohen's Kappa over paired labels from two raters.
///
/// The label set is the union of labels either rater used.
pub fn cohen_kappa<T: Ord>(pairs: &[(T, T)]) -> Result<f64, KappaError> {
    if pairs.is_empty() {
        return Err(KappaError::EmptyTable);
    }

    let mut labels: BTreeMap<&T, usize> = BTreeMap::new();
    for (a, b) in pairs {
        let next = labels.len();
        labels.entry(a).or_insert(next);
        let next = labels.len();
        labels.entry(b).or_insert(next);
    }

    let k = labels.len();
    let mut first_marginal = vec![0usize; k];
    let mut second_marginal = vec![0usize; k];
    let mut agreed = 0usize;

    for (a, b) in pairs {
        let i = labels[a];
        let j = labels[b];
        first_marginal[i] += 1;
        second_marginal[j] += 1;
        if i == j {
            agreed += 1;
        }
    }

    let total = pairs.len() as f64;
    let p_o = agreed as f64 / total;
    let p_e: f64 = first_marginal
        .iter()
        .zip(&second_marginal)
        .map(|(&a, &b)| (a as f64 / total) * (b as f64 / total))
        .sum();

    if (1.0 - p_e).abs() < CHANCE_EPSILON {
        return Err(KappaError::DegenerateChance);
    }

    Ok((p_o - p_e) / (1.0 - p_e))
}
