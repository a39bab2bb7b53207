//! Survey export loading.
//!
//! This module reads the annotation survey export (one CSV row per
//! annotator submission) into typed [`RatingRecord`]s and groups them by
//! site and platform.

pub mod site_info;
pub mod sites;
pub mod timing;

pub use site_info::{load_site_info, SiteInfo};
pub use sites::{load_site_list, SiteListing};
pub use timing::{load_timings, Timings};

use crate::error::SurveyError;
use crate::models::{Platform, Question, RatingRecord, Response, SiteKey};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const START_DATE: &str = "StartDate";
const SITE_COLUMN: &str = "eval-site";
const PLATFORM_COLUMN: &str = "eval-platform";
const NAME_COLUMN: &str = "eval-name";

/// Rating records grouped by site group.
///
/// Groups are keyed by `(site, platform)` and iterate in key order, so
/// every computation over a `Survey` is independent of the order rows
/// arrived in.
#[derive(Debug, Clone, Default)]
pub struct Survey {
    groups: BTreeMap<SiteKey, Vec<RatingRecord>>,
}

impl Survey {
    /// Group records by their site key.
    pub fn from_records(records: impl IntoIterator<Item = RatingRecord>) -> Self {
        let mut groups: BTreeMap<SiteKey, Vec<RatingRecord>> = BTreeMap::new();

        for record in records {
            groups.entry(record.key.clone()).or_default().push(record);
        }

        Self { groups }
    }

    pub fn groups(&self) -> impl Iterator<Item = (&SiteKey, &[RatingRecord])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Column positions resolved from the header row.
struct Columns {
    start_date: Option<usize>,
    site: usize,
    platform: usize,
    name: usize,
    questions: Vec<(Question, usize)>,
}

/// Reads a survey export for a fixed set of questions.
pub struct SurveyLoader {
    questions: Vec<Question>,
}

impl SurveyLoader {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Load and group all submissions from a CSV file.
    pub fn load(&self, path: &Path) -> Result<Survey, SurveyError> {
        let file = File::open(path).map_err(|source| SurveyError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.load_from_reader(file, path)
    }

    /// Load from any reader; `source` is only used in error messages.
    pub fn load_from_reader<R: Read>(&self, input: R, source: &Path) -> Result<Survey, SurveyError> {
        let reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
        self.read(reader, source)
    }

    fn read<R: Read>(&self, mut reader: csv::Reader<R>, path: &Path) -> Result<Survey, SurveyError> {
        let csv_err = |source: csv::Error| SurveyError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let headers = reader.headers().map_err(csv_err)?.clone();
        let columns = self.resolve_columns(&headers, path)?;

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for row in reader.records() {
            let row = row.map_err(csv_err)?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);
            let cell = |idx: usize| row.get(idx).unwrap_or("");

            if let Some(idx) = columns.start_date {
                let start = cell(idx);
                // Label and import-id rows emitted by the survey platform
                if start == "Start Date" || start.starts_with('{') {
                    debug!("Skipping metadata row on line {}", line);
                    continue;
                }
            }

            let site = cell(columns.site).trim();
            let platform_raw = cell(columns.platform).trim();

            if site.is_empty() || platform_raw.is_empty() {
                warn!(
                    "Skipping incomplete submission on line {} (site `{}`, platform `{}`)",
                    line, site, platform_raw
                );
                skipped += 1;
                continue;
            }

            let platform =
                Platform::from_label(platform_raw).ok_or_else(|| SurveyError::UnknownPlatform {
                    path: path.to_path_buf(),
                    line,
                    value: platform_raw.to_string(),
                })?;

            let mut record = RatingRecord::new(SiteKey::new(site, platform), cell(columns.name).trim());
            for &(question, idx) in &columns.questions {
                record
                    .responses
                    .insert(question, Response::parse(cell(idx)));
            }

            records.push(record);
        }

        if skipped > 0 {
            warn!("Skipped {} incomplete submissions", skipped);
        }

        let survey = Survey::from_records(records);
        debug!(
            "Loaded {} records in {} site groups from {}",
            survey.record_count(),
            survey.group_count(),
            path.display()
        );

        Ok(survey)
    }

    fn resolve_columns(&self, headers: &csv::StringRecord, path: &Path) -> Result<Columns, SurveyError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| SurveyError::MissingColumn {
                path: PathBuf::from(path),
                column: name.to_string(),
            })
        };

        let questions = self
            .questions
            .iter()
            .map(|&q| require(q.label()).map(|idx| (q, idx)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Columns {
            start_date: find(START_DATE),
            site: require(SITE_COLUMN)?,
            platform: require(PLATFORM_COLUMN)?,
            name: require(NAME_COLUMN)?,
            questions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Likert;
    use std::io::Write;

    const EXPORT: &str = "\
StartDate,EndDate,eval-site,eval-platform,eval-name,button-discover,button-comments
Start Date,End Date,Site,Platform,Name,Button discover,Comments
\"{\"\"ImportId\"\":\"\"x\"\"}\",\"{\"\"ImportId\"\":\"\"y\"\"}\",{},{},{},{},{}
2023-01-01,2023-01-01,https://a.org,Desktop,Alice,Strongly agree,fine
2023-01-01,2023-01-01,https://a.org,Desktop,Bob,Somewhat agree,
2023-01-02,2023-01-02,https://a.org,Mobile,Alice,,missing
2023-01-02,2023-01-02,https://b.org,Desktop,Alice,Not applicable,
";

    fn group<'s>(survey: &'s Survey, site: &str, platform: Platform) -> &'s [RatingRecord] {
        let key = SiteKey::new(site, platform);
        survey
            .groups()
            .find(|(k, _)| **k == key)
            .map(|(_, records)| records)
            .unwrap()
    }

    fn loader() -> SurveyLoader {
        SurveyLoader::new(vec![Question::ButtonDiscover])
    }

    #[test]
    fn test_load_skips_metadata_rows_and_groups() {
        let survey = loader()
            .load_from_reader(EXPORT.as_bytes(), Path::new("export.csv"))
            .unwrap();

        assert_eq!(survey.record_count(), 4);
        assert_eq!(survey.group_count(), 3);

        let desktop = group(&survey, "https://a.org", Platform::Desktop);
        assert_eq!(desktop.len(), 2);
        assert_eq!(
            desktop[0].response(Question::ButtonDiscover),
            &Response::Likert(Likert::StronglyAgree)
        );

        let mobile = group(&survey, "https://a.org", Platform::Mobile);
        assert_eq!(mobile[0].response(Question::ButtonDiscover), &Response::Unanswered);

        let other = group(&survey, "https://b.org", Platform::Desktop);
        assert_eq!(
            other[0].response(Question::ButtonDiscover),
            &Response::Other("Not applicable".to_string())
        );
    }

    #[test]
    fn test_missing_question_column() {
        let loader = SurveyLoader::new(vec![Question::SafetyDiscover]);
        let err = loader
            .load_from_reader(EXPORT.as_bytes(), Path::new("export.csv"))
            .unwrap_err();
        assert!(
            matches!(err, SurveyError::MissingColumn { ref column, .. } if column == "safety-discover")
        );
    }

    #[test]
    fn test_unknown_platform_is_an_error() {
        let data = "eval-site,eval-platform,eval-name,button-discover\nhttps://a.org,Tablet,Alice,\n";
        let err = loader()
            .load_from_reader(data.as_bytes(), Path::new("export.csv"))
            .unwrap_err();
        assert!(matches!(err, SurveyError::UnknownPlatform { ref value, line: 2, .. } if value == "Tablet"));
    }

    #[test]
    fn test_missing_file() {
        let err = loader().load(Path::new("/no/such/export.csv")).unwrap_err();
        assert!(matches!(err, SurveyError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXPORT.as_bytes()).unwrap();

        let survey = loader().load(file.path()).unwrap();
        assert_eq!(survey.group_count(), 3);
    }

    #[test]
    fn test_incomplete_rows_are_skipped() {
        let data = "eval-site,eval-platform,eval-name,button-discover\n,,Alice,\nhttps://a.org,Mobile,Bob,Strongly agree\n";
        let survey = loader()
            .load_from_reader(data.as_bytes(), Path::new("export.csv"))
            .unwrap();
        assert_eq!(survey.record_count(), 1);
    }

    #[test]
    fn test_rows_missing_site_or_platform_are_skipped() {
        let data = "\
eval-site,eval-platform,eval-name,button-discover
,Desktop,Alice,Strongly agree
https://a.org,,Alice,Strongly agree
https://a.org,Mobile,Bob,Strongly agree
";
        let survey = loader()
            .load_from_reader(data.as_bytes(), Path::new("export.csv"))
            .unwrap();

        assert_eq!(survey.record_count(), 1);
        assert!(survey.groups().all(|(key, _)| !key.site.is_empty()));
        assert_eq!(group(&survey, "https://a.org", Platform::Mobile).len(), 1);
    }
}
