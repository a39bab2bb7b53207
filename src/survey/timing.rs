//! Task timings from the evaluation harness output.
//!
//! Each evaluation file holds one evaluator's run: a list of sites with
//! the seconds taken to learn and recall each quick exit mechanism.

use crate::error::SurveyError;
use crate::models::{Platform, SiteKey, TimingTest};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// An existing timing at or below this is treated as unset when merging.
const MERGE_FLOOR: f64 = 0.1;

#[derive(Debug, Deserialize)]
struct EvaluationFile {
    evaluated: Vec<EvaluatedSite>,
}

#[derive(Debug, Deserialize)]
struct EvaluatedSite {
    url: String,
    is_mobile: bool,
    #[serde(flatten)]
    fields: BTreeMap<String, serde_json::Value>,
}

/// Task timings per site group, merged across evaluation files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timings {
    sites: BTreeMap<SiteKey, BTreeMap<TimingTest, f64>>,
}

impl Timings {
    /// Fold one measurement in. Non-positive measurements are ignored; a
    /// new measurement is averaged with an existing one above the floor
    /// and replaces it otherwise.
    pub fn record(&mut self, key: SiteKey, test: TimingTest, seconds: f64) {
        if seconds <= 0.0 {
            return;
        }

        let slot = self.sites.entry(key).or_default().entry(test).or_insert(0.0);
        if *slot > MERGE_FLOOR {
            *slot = (*slot + seconds) / 2.0;
        } else {
            *slot = seconds;
        }
    }

    pub fn get(&self, key: &SiteKey, test: TimingTest) -> Option<f64> {
        self.sites.get(key).and_then(|tests| tests.get(&test)).copied()
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }
}

/// Load and merge evaluation files in the order given.
pub fn load_timings(paths: &[impl AsRef<Path>]) -> Result<Timings, SurveyError> {
    let mut timings = Timings::default();

    for path in paths {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SurveyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        merge_timings_from_reader(&mut timings, BufReader::new(file), path)?;
    }

    Ok(timings)
}

/// Merge one evaluation file; `source` is only used in error messages.
pub fn merge_timings_from_reader<R: Read>(
    timings: &mut Timings,
    input: R,
    source: &Path,
) -> Result<(), SurveyError> {
    let evaluation: EvaluationFile =
        serde_json::from_reader(input).map_err(|source_err| SurveyError::Json {
            path: source.to_path_buf(),
            source: source_err,
        })?;

    debug!(
        "{}: {} evaluated sites",
        source.display(),
        evaluation.evaluated.len()
    );

    for site in evaluation.evaluated {
        let platform = if site.is_mobile {
            Platform::Mobile
        } else {
            Platform::Desktop
        };
        let key = SiteKey::new(site.url, platform);

        for test in TimingTest::ALL {
            if let Some(seconds) = site.fields.get(test.label()).and_then(|v| v.as_f64()) {
                timings.record(key.clone(), test, seconds);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EVALUATION: &str = r#"{
        "name": "evaluator one",
        "evaluated": [
            {"url": "https://a.org", "is_mobile": false, "learn_button_time": 4.0, "recall_button_time": 0},
            {"url": "https://a.org", "is_mobile": true, "learn_shortcut_time": 12.5, "notes": "slow"}
        ]
    }"#;

    fn key(site: &str, platform: Platform) -> SiteKey {
        SiteKey::new(site, platform)
    }

    #[test]
    fn test_merge_rule() {
        let mut timings = Timings::default();
        let k = key("https://a.org", Platform::Desktop);

        timings.record(k.clone(), TimingTest::LearnButton, 4.0);
        timings.record(k.clone(), TimingTest::LearnButton, 6.0);
        assert_eq!(timings.get(&k, TimingTest::LearnButton), Some(5.0));

        // Non-positive values never land
        timings.record(k.clone(), TimingTest::RecallButton, 0.0);
        timings.record(k.clone(), TimingTest::RecallButton, -1.0);
        assert_eq!(timings.get(&k, TimingTest::RecallButton), None);

        // An existing value at the floor is replaced, not averaged
        timings.record(k.clone(), TimingTest::LearnShortcut, 0.05);
        timings.record(k.clone(), TimingTest::LearnShortcut, 8.0);
        assert_eq!(timings.get(&k, TimingTest::LearnShortcut), Some(8.0));
    }

    #[test]
    fn test_merge_evaluation_files() {
        let mut timings = Timings::default();
        merge_timings_from_reader(&mut timings, EVALUATION.as_bytes(), Path::new("one.json")).unwrap();

        let second = r#"{"evaluated": [{"url": "https://a.org", "is_mobile": false, "learn_button_time": 6.0}]}"#;
        merge_timings_from_reader(&mut timings, second.as_bytes(), Path::new("two.json")).unwrap();

        let desktop = key("https://a.org", Platform::Desktop);
        let mobile = key("https://a.org", Platform::Mobile);
        assert_eq!(timings.site_count(), 2);
        assert_eq!(timings.get(&desktop, TimingTest::LearnButton), Some(5.0));
        assert_eq!(timings.get(&desktop, TimingTest::RecallButton), None);
        assert_eq!(timings.get(&mobile, TimingTest::LearnShortcut), Some(12.5));
    }

    #[test]
    fn test_load_timings_from_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EVALUATION.as_bytes()).unwrap();

        let timings = load_timings(&[file.path()]).unwrap();
        assert_eq!(
            timings.get(&key("https://a.org", Platform::Mobile), TimingTest::LearnShortcut),
            Some(12.5)
        );
    }

    #[test]
    fn test_malformed_evaluation_file() {
        let mut timings = Timings::default();
        let err = merge_timings_from_reader(&mut timings, "{\"evaluated\": 3}".as_bytes(), Path::new("bad.json"))
            .unwrap_err();
        assert!(matches!(err, SurveyError::Json { .. }));
    }
}
