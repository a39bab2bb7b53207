//! Per-site quick exit button descriptions.
//!
//! One row per evaluated site group describing how its quick exit button
//! looks and where it sits. Drives the rows of the combined dataset.

use crate::error::SurveyError;
use crate::models::{Platform, SiteKey};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One row of the site info sheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteInfo {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Platform")]
    pub platform: Platform,
    #[serde(rename = "Size", default)]
    pub size: String,
    #[serde(rename = "Location", default)]
    pub location: String,
    #[serde(rename = "Type", default)]
    pub button_type: String,
    #[serde(rename = "Sticky?", default)]
    pub sticky: String,
    #[serde(rename = "Visible on load?", default)]
    pub visible_on_load: String,
    #[serde(rename = "Label", default)]
    pub label: String,
    #[serde(rename = "Clicks Required", default)]
    pub clicks_required: String,
}

impl SiteInfo {
    pub fn key(&self) -> SiteKey {
        SiteKey::new(self.url.trim(), self.platform)
    }

    /// Spreadsheet-style truthiness of the `Sticky?` cell.
    pub fn is_sticky(&self) -> bool {
        matches!(
            self.sticky.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        )
    }

    pub fn is_labelled(&self) -> bool {
        !self.label.trim().is_empty()
    }

    pub fn is_single_click(&self) -> bool {
        self.clicks_required.trim() == "1"
    }
}

/// Load every row of a site info CSV.
pub fn load_site_info(path: &Path) -> Result<Vec<SiteInfo>, SurveyError> {
    let file = File::open(path).map_err(|source| SurveyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_site_info_from_reader(file, path)
}

pub fn load_site_info_from_reader<R: Read>(
    input: R,
    source: &Path,
) -> Result<Vec<SiteInfo>, SurveyError> {
    csv::Reader::from_reader(input)
        .deserialize()
        .collect::<Result<Vec<SiteInfo>, csv::Error>>()
        .map_err(|err| SurveyError::Csv {
            path: source.to_path_buf(),
            source: err,
        })
}
