//! Chi-squared test of mechanism presence across region x category.
//!
//! Expected counts come from the overall presence rate applied to the
//! number of sites in each cell; each cell reports its Pearson residual.

use super::distribution::chi_squared_sf;
use crate::config::CategoryGroup;
use crate::models::{CellResidual, Mechanism, Platform, ResidualBand, SignificanceResult};
use crate::survey::SiteListing;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Category that absorbs anything not listed.
pub const FALLBACK_CATEGORY: &str = "Misc";

/// Maps raw site categories onto the columns of the test.
#[derive(Debug, Clone)]
pub struct CategoryScheme {
    columns: Vec<String>,
    lookup: HashMap<String, String>,
    collapsed: bool,
}

impl CategoryScheme {
    /// One column per listed category.
    pub fn fine(categories: &[String]) -> Self {
        let lookup = categories.iter().map(|c| (c.clone(), c.clone())).collect();
        Self::with_fallback(categories.to_vec(), lookup, false)
    }

    /// One column per group; members map onto their group.
    pub fn collapsed(groups: &[CategoryGroup]) -> Self {
        let columns = groups.iter().map(|g| g.name.clone()).collect();
        let lookup = groups
            .iter()
            .flat_map(|g| g.members.iter().map(move |m| (m.clone(), g.name.clone())))
            .collect();
        Self::with_fallback(columns, lookup, true)
    }

    fn with_fallback(
        mut columns: Vec<String>,
        lookup: HashMap<String, String>,
        collapsed: bool,
    ) -> Self {
        if !columns.iter().any(|c| c == FALLBACK_CATEGORY) {
            columns.push(FALLBACK_CATEGORY.to_string());
        }
        Self {
            columns,
            lookup,
            collapsed,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn classify<'s>(&'s self, raw: &str) -> &'s str {
        self.lookup
            .get(raw.trim())
            .map(String::as_str)
            .unwrap_or(FALLBACK_CATEGORY)
    }
}

/// A configured presence test over a fixed region list.
pub struct PresenceTest<'a> {
    regions: &'a [String],
    scheme: &'a CategoryScheme,
    population: Option<usize>,
}

#[derive(Default, Clone, Copy)]
struct Cell {
    sites: usize,
    present: usize,
}

impl<'a> PresenceTest<'a> {
    pub fn new(regions: &'a [String], scheme: &'a CategoryScheme) -> Self {
        Self {
            regions,
            scheme,
            population: None,
        }
    }

    /// Override the presence-rate denominator (defaults to the number of
    /// sites counted).
    pub fn with_population(mut self, population: Option<usize>) -> Self {
        self.population = population;
        self
    }

    pub fn run(
        &self,
        sites: &[SiteListing],
        platform: Platform,
        mechanism: Mechanism,
    ) -> SignificanceResult {
        let columns = self.scheme.columns();
        let mut cells = vec![Cell::default(); self.regions.len() * columns.len()];
        let mut counted = 0usize;
        let mut present = 0usize;
        let mut skipped = 0usize;

        for site in sites {
            let Some(r) = self.regions.iter().position(|r| r == site.region.trim()) else {
                debug!("Skipping site in unlisted region `{}`", site.region);
                skipped += 1;
                continue;
            };
            let category = self.scheme.classify(&site.category);
            let c = columns
                .iter()
                .position(|col| col == category)
                .unwrap_or(columns.len() - 1);

            let cell = &mut cells[r * columns.len() + c];
            cell.sites += 1;
            counted += 1;
            if site.has(platform, mechanism) {
                cell.present += 1;
                present += 1;
            }
        }

        if skipped > 0 {
            warn!("Skipped {} sites outside the configured regions", skipped);
        }

        let population = self.population.unwrap_or(counted);
        let likelihood = if population == 0 {
            0.0
        } else {
            present as f64 / population as f64
        };

        let mut residuals = Vec::with_capacity(cells.len());
        let mut chi2 = 0.0;
        for (r, region) in self.regions.iter().enumerate() {
            for (c, category) in columns.iter().enumerate() {
                let cell = cells[r * columns.len() + c];
                let expected = likelihood * cell.sites as f64;
                let residual = if expected != 0.0 {
                    (cell.present as f64 - expected) / expected.sqrt()
                } else {
                    0.0
                };
                chi2 += residual * residual;

                residuals.push(CellResidual {
                    region: region.clone(),
                    category: category.clone(),
                    sites: cell.sites,
                    observed: cell.present,
                    expected,
                    residual,
                    band: ResidualBand::from_residual(residual),
                });
            }
        }

        let dof = self.regions.len().saturating_sub(1) * columns.len().saturating_sub(1);
        let p_value = chi_squared_sf(chi2, dof);
        debug!(
            "{} {}: chi2 = {:.4}, dof = {}, p = {:.4}",
            platform, mechanism, chi2, dof, p_value
        );

        SignificanceResult {
            platform,
            mechanism,
            collapsed: self.scheme.is_collapsed(),
            chi2,
            dof,
            p_value,
            present,
            population,
            cells: residuals,
        }
    }
}
