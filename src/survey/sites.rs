//! Site list loading for the mechanism presence analysis.

use crate::error::SurveyError;
use crate::models::{Mechanism, Platform};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One row of the site list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteListing {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Desktop Exit Button?", default)]
    pub desktop_button: String,
    #[serde(rename = "Keyboard shortcut type", default)]
    pub desktop_shortcut: String,
    #[serde(rename = "Mobile Exit button?", default)]
    pub mobile_button: String,
    #[serde(rename = "Mobile shortcut?", default)]
    pub mobile_shortcut: String,
}

impl SiteListing {
    /// A mechanism is present when its column is filled in.
    pub fn has(&self, platform: Platform, mechanism: Mechanism) -> bool {
        let cell = match (platform, mechanism) {
            (Platform::Desktop, Mechanism::Button) => &self.desktop_button,
            (Platform::Desktop, Mechanism::Shortcut) => &self.desktop_shortcut,
            (Platform::Mobile, Mechanism::Button) => &self.mobile_button,
            (Platform::Mobile, Mechanism::Shortcut) => &self.mobile_shortcut,
        };
        !cell.trim().is_empty()
    }
}

/// Load every listing from a site list CSV.
pub fn load_site_list(path: &Path) -> Result<Vec<SiteListing>, SurveyError> {
    let file = File::open(path).map_err(|source| SurveyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_site_list_from_reader(file, path)
}

pub fn load_site_list_from_reader<R: Read>(
    input: R,
    source: &Path,
) -> Result<Vec<SiteListing>, SurveyError> {
    read_listings(csv::Reader::from_reader(input), source)
}

fn read_listings<R: Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
) -> Result<Vec<SiteListing>, SurveyError> {
    reader
        .deserialize()
        .collect::<Result<Vec<SiteListing>, csv::Error>>()
        .map_err(|source| SurveyError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITES: &str = "\
URL,Region,Category,Desktop Exit Button?,Keyboard shortcut type,Mobile Exit button?,Mobile shortcut?
https://a.org,UK,Domestic Abuse,Yes,Esc x3,,
https://b.org,USA,Gambling,,,Yes,
";

    #[test]
    fn test_load_and_presence() {
        let sites = load_site_list_from_reader(SITES.as_bytes(), Path::new("sites.csv")).unwrap();
        assert_eq!(sites.len(), 2);

        assert_eq!(sites[0].region, "UK");
        assert!(sites[0].has(Platform::Desktop, Mechanism::Button));
        assert!(sites[0].has(Platform::Desktop, Mechanism::Shortcut));
        assert!(!sites[0].has(Platform::Mobile, Mechanism::Button));

        assert!(sites[1].has(Platform::Mobile, Mechanism::Button));
        assert!(!sites[1].has(Platform::Mobile, Mechanism::Shortcut));
    }

    #[test]
    fn test_missing_region_column_fails() {
        let data = "URL,Category\nhttps://a.org,Misc\n";
        let err = load_site_list_from_reader(data.as_bytes(), Path::new("sites.csv")).unwrap_err();
        assert!(matches!(err, SurveyError::Csv { .. }));
    }
}
